//! `mdvar render` command implementation.

use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use mdvar_config::{CliSettings, Config};
use mdvar_inject::InjectionPlugin;
use mdvar_renderer::{MarkdownCompiler, MissingPolicy, RenderResult, SpliceMode};
use rayon::prelude::*;

use super::load_registry;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Markdown files to render.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Path to configuration file (default: auto-discover mdvar.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for rendered `.html` files (default: print to stdout).
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Fallback for unresolved variables: empty, comment or source (overrides config).
    #[arg(long)]
    on_missing: Option<MissingPolicy>,

    /// Default splice mode: html or markdown (overrides config).
    #[arg(long)]
    splice: Option<SpliceMode>,

    /// Disable GitHub Flavored Markdown extensions.
    #[arg(long)]
    no_gfm: bool,
}

impl RenderArgs {
    /// Execute the render command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration or the registry is invalid, or if any
    /// document fails to read or write. Unresolved variables are warnings.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            gfm: self.no_gfm.then_some(false),
            splice: self.splice,
            on_missing: self.on_missing,
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        let registry = load_registry(&config)?;
        output.info(&format!("Loaded {} variables", registry.len()));

        let compiler = MarkdownCompiler::with_config(config.compiler.compiler_config());
        let factory = InjectionPlugin::create(Arc::new(registry));
        let options = config.inject.hook_options();

        if let Some(out_dir) = &self.out_dir {
            std::fs::create_dir_all(out_dir)?;
        }

        // The plugin is activated per document; only the first activation installs the hook.
        let rendered: Vec<(&PathBuf, Result<RenderResult, CliError>)> = self
            .files
            .par_iter()
            .map(|path| {
                factory.activate(&compiler, &options);
                let result = std::fs::read_to_string(path)
                    .map(|markdown| compiler.render(&markdown))
                    .map_err(|source| CliError::Read {
                        path: path.clone(),
                        source,
                    });
                (path, result)
            })
            .collect();

        let mut failed = 0;
        let mut warnings = 0;
        let mut targets = HashSet::new();

        for (path, result) in rendered {
            let result = match result {
                Ok(result) => result,
                Err(e) => {
                    output.error(&e.to_string());
                    failed += 1;
                    continue;
                }
            };

            for warning in &result.warnings {
                output.warning(&format!("{}: {warning}", path.display()));
            }
            warnings += result.warnings.len();

            if let Err(e) = self.emit(path, &result.html, &mut targets, &output) {
                output.error(&e.to_string());
                failed += 1;
            }
        }

        let total = self.files.len();
        if failed > 0 {
            return Err(CliError::Render(format!(
                "{failed} of {total} documents failed"
            )));
        }

        output.success(&format!("Rendered {total} documents ({warnings} warnings)"));
        Ok(())
    }

    /// Write one document to the output directory, or to stdout without one.
    fn emit(
        &self,
        path: &Path,
        html: &str,
        targets: &mut HashSet<PathBuf>,
        output: &Output,
    ) -> Result<(), CliError> {
        let Some(out_dir) = &self.out_dir else {
            output.document(html);
            return Ok(());
        };

        let target = output_path(out_dir, path);
        if !targets.insert(target.clone()) {
            output.warning(&format!(
                "{}: overwrites {}",
                path.display(),
                target.display()
            ));
        }

        std::fs::write(&target, html).map_err(|source| CliError::Write {
            path: target.clone(),
            source,
        })?;
        tracing::debug!(source = %path.display(), target = %target.display(), "Wrote document");

        Ok(())
    }
}

/// `<out_dir>/<input stem>.html`.
fn output_path(out_dir: &Path, input: &Path) -> PathBuf {
    let mut name = input
        .file_stem()
        .unwrap_or_else(|| OsStr::new("document"))
        .to_os_string();
    name.push(".html");
    out_dir.join(name)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_output_path() {
        let out = Path::new("/site");
        assert_eq!(
            output_path(out, Path::new("docs/guide.md")),
            PathBuf::from("/site/guide.html")
        );
        assert_eq!(
            output_path(out, Path::new("notes.v2.md")),
            PathBuf::from("/site/notes.v2.html")
        );
        assert_eq!(
            output_path(out, Path::new("README")),
            PathBuf::from("/site/README.html")
        );
    }

    fn args(tmp: &TempDir, files: Vec<PathBuf>) -> RenderArgs {
        RenderArgs {
            files,
            config: Some(tmp.path().join("mdvar.toml")),
            out_dir: Some(tmp.path().join("out")),
            on_missing: None,
            splice: None,
            no_gfm: false,
        }
    }

    #[test]
    fn test_render_documents_to_out_dir() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("mdvar.toml"),
            "[variables]\ngreeting = \"**Hello**\"\n",
        )
        .unwrap();
        let first = tmp.path().join("first.md");
        let second = tmp.path().join("second.md");
        fs::write(&first, "Say: :embed[greeting]\n").unwrap();
        fs::write(&second, "Hi :embed[nobody]\n").unwrap();

        args(&tmp, vec![first, second]).execute().unwrap();

        let out = tmp.path().join("out");
        assert_eq!(
            fs::read_to_string(out.join("first.html")).unwrap(),
            "<p>Say: <p><strong>Hello</strong></p>\n</p>\n"
        );
        assert_eq!(
            fs::read_to_string(out.join("second.html")).unwrap(),
            "<p>Hi</p>\n"
        );
    }

    #[test]
    fn test_missing_document_fails() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("mdvar.toml"), "").unwrap();

        let err = args(&tmp, vec![tmp.path().join("absent.md")])
            .execute()
            .unwrap_err();

        assert_eq!(err.to_string(), "1 of 1 documents failed");
    }

    #[test]
    fn test_cyclic_registry_fails_before_rendering() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("mdvar.toml"),
            "[variables]\na = \":embed[b]\"\nb = \":embed[a]\"\n",
        )
        .unwrap();
        let doc = tmp.path().join("doc.md");
        fs::write(&doc, ":embed[a]\n").unwrap();

        let err = args(&tmp, vec![doc]).execute().unwrap_err();

        assert!(matches!(err, CliError::Registry(_)));
        assert!(!tmp.path().join("out").exists());
    }
}
