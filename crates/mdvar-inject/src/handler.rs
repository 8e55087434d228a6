//! Token handler resolving variable keys against the registry.

use std::sync::Arc;

use mdvar_renderer::{RenderFn, RenderResult, TokenError, TokenHandler};

use crate::VariableRegistry;

/// Resolves injection tokens to rendered fragments.
///
/// Fragments are rendered through the bound [`RenderFn`], so tokens nested in
/// a fragment expand with the same compiler and hooks as the document.
pub struct InjectionHandler {
    registry: Arc<VariableRegistry>,
    render_fn: RenderFn,
}

impl InjectionHandler {
    /// Create a handler rendering fragments from `registry` with `render_fn`.
    #[must_use]
    pub fn new(registry: Arc<VariableRegistry>, render_fn: RenderFn) -> Self {
        Self {
            registry,
            render_fn,
        }
    }
}

impl TokenHandler for InjectionHandler {
    fn source(&self, key: &str) -> Result<String, TokenError> {
        Ok(self.registry.get(key)?.to_owned())
    }

    fn resolve(&self, key: &str) -> Result<RenderResult, TokenError> {
        let fragment = self.registry.get(key)?;
        tracing::debug!(key, bytes = fragment.len(), "Rendering variable");
        Ok(self.render_fn.render(fragment))
    }
}
