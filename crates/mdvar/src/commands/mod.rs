//! CLI command implementations.

pub(crate) mod check;
pub(crate) mod render;

pub(crate) use check::CheckArgs;
pub(crate) use render::RenderArgs;

use mdvar_config::Config;
use mdvar_inject::VariableRegistry;

use crate::error::CliError;

/// Build the variable registry from inline variables and fragment files.
fn load_registry(config: &Config) -> Result<VariableRegistry, CliError> {
    let registry = VariableRegistry::with_directive(&config.inject.directive, config.entries()?)?;
    Ok(registry)
}
