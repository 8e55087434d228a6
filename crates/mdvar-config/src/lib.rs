//! Configuration management for mdvar.
//!
//! Parses `mdvar.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ```toml
//! [compiler]
//! gfm = true
//! max_depth = 10
//!
//! [inject]
//! directive = "embed"
//! splice = "html"
//! on_missing = "empty"
//!
//! [variables]
//! greeting = "**Hello**"
//!
//! [fragments]
//! include = ["fragments/*.md"]
//! ```
//!
//! ## Environment Variable Expansion
//!
//! `fragments.include` patterns support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Variable values and fragment file contents are never expanded.

mod expand;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use mdvar_renderer::directive::is_valid_directive_name;
use mdvar_renderer::{CompilerConfig, HookOptions, MissingPolicy, SpliceMode};
use serde::Deserialize;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override GFM extensions.
    pub gfm: Option<bool>,
    /// Override the default splice mode.
    pub splice: Option<SpliceMode>,
    /// Override the unresolved-key fallback.
    pub on_missing: Option<MissingPolicy>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "mdvar.toml";

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Markdown compiler configuration.
    pub compiler: CompilerSection,
    /// Injection token configuration.
    pub inject: InjectSection,
    /// Inline variables: key to markdown fragment.
    pub variables: BTreeMap<String, String>,
    /// Fragment file patterns (relative strings from TOML).
    fragments: FragmentsConfigRaw,

    /// Fragment files matched by `fragments.include` (set after loading).
    #[serde(skip)]
    pub fragment_files: Vec<PathBuf>,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// `[compiler]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CompilerSection {
    /// Enable GitHub Flavored Markdown extensions.
    pub gfm: bool,
    /// Markdown splice recursion limit.
    pub max_depth: usize,
}

impl Default for CompilerSection {
    fn default() -> Self {
        let defaults = CompilerConfig::default();
        Self {
            gfm: defaults.gfm,
            max_depth: defaults.max_depth,
        }
    }
}

impl CompilerSection {
    /// Compiler settings for [`MarkdownCompiler`](mdvar_renderer::MarkdownCompiler).
    #[must_use]
    pub fn compiler_config(&self) -> CompilerConfig {
        CompilerConfig::default()
            .with_gfm(self.gfm)
            .with_max_depth(self.max_depth)
    }
}

/// `[inject]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct InjectSection {
    /// Directive name of injection tokens.
    pub directive: String,
    /// Default splice mode.
    pub splice: SpliceMode,
    /// Unresolved-key fallback.
    pub on_missing: MissingPolicy,
}

impl Default for InjectSection {
    fn default() -> Self {
        let defaults = HookOptions::default();
        Self {
            directive: defaults.directive,
            splice: defaults.splice,
            on_missing: defaults.on_missing,
        }
    }
}

impl InjectSection {
    /// Hook options for activating the injection plugin.
    #[must_use]
    pub fn hook_options(&self) -> HookOptions {
        HookOptions::new(self.directive.clone())
            .with_splice(self.splice)
            .with_on_missing(self.on_missing)
    }
}

/// Raw `[fragments]` section as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FragmentsConfigRaw {
    include: Vec<String>,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`fragments.include`").
        field: String,
        /// Error message (e.g., "${`SHARED_DIR`} not set").
        message: String,
    },
    /// Invalid fragment file pattern.
    #[error("Invalid fragment pattern '{pattern}': {message}")]
    Glob {
        /// Pattern after expansion.
        pattern: String,
        /// Parser message.
        message: String,
    },
    /// Fragment file could not be read.
    #[error("Failed to read fragment {}: {source}", .path.display())]
    Fragment {
        /// Fragment file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `mdvar.toml` in current directory and parents,
    /// falling back to defaults with no variables.
    ///
    /// CLI settings are applied after loading, taking precedence over config
    /// file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            tracing::debug!(path = %discovered.display(), "Discovered config file");
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(gfm) = settings.gfm {
            self.compiler.gfm = gfm;
        }
        if let Some(splice) = settings.splice {
            self.inject.splice = splice;
        }
        if let Some(on_missing) = settings.on_missing {
            self.inject.on_missing = on_missing;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before matching fragment files
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_fragments(config_dir)?;
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file. Variable keys are
    /// checked when the registry is built.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.compiler.max_depth == 0 {
            return Err(ConfigError::Validation(
                "compiler.max_depth must be greater than 0".to_owned(),
            ));
        }

        if !is_valid_directive_name(&self.inject.directive) {
            return Err(ConfigError::Validation(format!(
                "inject.directive '{}' must start with a letter and contain only letters, digits, '-' and '_'",
                self.inject.directive
            )));
        }

        Ok(())
    }

    /// Expand environment variable references in fragment patterns.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        for pattern in &mut self.fragments.include {
            *pattern = expand::expand_env(pattern, "fragments.include")?;
        }
        Ok(())
    }

    /// Match `fragments.include` patterns relative to the config directory.
    ///
    /// Only files are kept. The result is sorted and deduplicated.
    fn resolve_fragments(&mut self, config_dir: &Path) -> Result<(), ConfigError> {
        let mut files = Vec::new();

        for pattern in &self.fragments.include {
            let full = config_dir.join(pattern);
            let full = full.to_string_lossy();
            let paths = glob::glob(&full).map_err(|e| ConfigError::Glob {
                pattern: pattern.clone(),
                message: e.msg.to_owned(),
            })?;

            let before = files.len();
            for entry in paths {
                match entry {
                    Ok(path) if path.is_file() => files.push(path),
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(path = %e.path().display(), error = %e.error(), "Skipping unreadable fragment path");
                    }
                }
            }
            if files.len() == before {
                tracing::warn!(pattern = %pattern, "Fragment pattern matched no files");
            }
        }

        files.sort();
        files.dedup();
        self.fragment_files = files;
        Ok(())
    }

    /// All `(key, fragment)` pairs: inline variables first, then fragment
    /// files keyed by file stem.
    ///
    /// A key defined both inline and by file appears twice; the registry
    /// rejects it as a duplicate.
    ///
    /// # Errors
    ///
    /// Returns error if a fragment file can't be read or its name isn't UTF-8.
    pub fn entries(&self) -> Result<Vec<(String, String)>, ConfigError> {
        let mut entries: Vec<(String, String)> = self
            .variables
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        for path in &self.fragment_files {
            let key = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .ok_or_else(|| {
                    ConfigError::Validation(format!(
                        "fragment file name is not valid UTF-8: {}",
                        path.display()
                    ))
                })?;
            let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Fragment {
                path: path.clone(),
                source,
            })?;
            entries.push((key.to_owned(), source));
        }

        Ok(entries)
    }
}
