//! `mdvar check` command implementation.

use std::path::PathBuf;

use clap::Args;
use mdvar_config::Config;
use mdvar_inject::VariableRegistry;

use super::load_registry;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the check command.
#[derive(Args)]
pub(crate) struct CheckArgs {
    /// Path to configuration file (default: auto-discover mdvar.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl CheckArgs {
    /// Execute the check command.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid configuration and for duplicate,
    /// malformed or cyclic variables.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let config = Config::load(self.config.as_deref(), None)?;
        match &config.config_path {
            Some(path) => output.info(&format!("Config: {}", path.display())),
            None => output.info("Config: none found, using defaults"),
        }

        let registry = load_registry(&config)?;
        output.highlight(&format!(
            "Variables ({}, directive '{}')",
            registry.len(),
            registry.directive()
        ));

        for key in registry.keys() {
            output.info(&format!("  {key}"));
            let references = registry.references(key);
            if !references.is_empty() {
                output.detail(&format!("    injects: {}", references.join(", ")));
            }
        }

        let dangling = dangling_references(&registry);
        for (key, reference) in &dangling {
            output.warning(&format!("{key}: references unregistered variable '{reference}'"));
        }

        output.success(&format!(
            "Registry OK: {} variables, no cycles, {} unresolved references",
            registry.len(),
            dangling.len()
        ));
        Ok(())
    }
}

/// `(key, reference)` pairs whose reference is not registered.
fn dangling_references(registry: &VariableRegistry) -> Vec<(&str, &str)> {
    registry
        .keys()
        .flat_map(move |key| {
            registry
                .references(key)
                .iter()
                .filter(move |reference| !registry.contains(reference))
                .map(move |reference| (key, reference.as_str()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_dangling_references() {
        let registry = VariableRegistry::new([
            ("intro", ":embed[name] and :embed[ghost]"),
            ("name", "Ada"),
            ("outro", "::embed[phantom]"),
        ])
        .unwrap();

        assert_eq!(
            dangling_references(&registry),
            vec![("intro", "ghost"), ("outro", "phantom")]
        );
    }

    #[test]
    fn test_check_rejects_duplicate_keys() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("greeting.md"), "Hi").unwrap();
        let config = tmp.path().join("mdvar.toml");
        fs::write(
            &config,
            "[variables]\ngreeting = \"Hello\"\n\n[fragments]\ninclude = [\"*.md\"]\n",
        )
        .unwrap();

        let err = CheckArgs {
            config: Some(config),
        }
        .execute()
        .unwrap_err();

        assert_eq!(err.to_string(), "duplicate variable key 'greeting'");
    }

    #[test]
    fn test_check_valid_registry() {
        let tmp = TempDir::new().unwrap();
        let config = tmp.path().join("mdvar.toml");
        fs::write(&config, "[variables]\na = \":embed[b]\"\nb = \"B\"\n").unwrap();

        assert!(CheckArgs {
            config: Some(config),
        }
        .execute()
        .is_ok());
    }
}
