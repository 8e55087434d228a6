//! Environment variable expansion for configuration strings.
//!
//! - `${VAR}` expands to the value of VAR, errors if unset
//! - `${VAR:-default}` expands to VAR if set, otherwise to `default`
//!
//! Bare `$VAR` is left alone.

use std::borrow::Cow;
use std::env::{self, VarError};

use crate::ConfigError;

/// Expand `${...}` references in `value`.
///
/// `field` names the config field in the error.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, lookup)
        .map(Cow::into_owned)
        .map_err(|e| ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{}}} not set", e.var_name),
        })
}

fn lookup(var: &str) -> Result<Option<String>, VarError> {
    env::var(var).map(Some)
}
