//! Lazily bound injection plugin.
//!
//! A [`PluginFactory`] is activated once per compiled document. The first
//! activation binds the host's render function and installs the token
//! handler; every later activation hands back the same middleware, so a
//! large document set shares one hook and one render binding.

use std::sync::{Arc, OnceLock};

use mdvar_renderer::{HookOptions, HostCompiler, Middleware, RenderFn};

use crate::{InjectionHandler, VariableRegistry};

/// Entry point for building injection plugins.
pub struct InjectionPlugin;

impl InjectionPlugin {
    /// Create a reusable plugin factory over `registry`.
    ///
    /// Nothing is bound or installed until the first
    /// [`activate`](PluginFactory::activate).
    #[must_use]
    pub fn create(registry: Arc<VariableRegistry>) -> PluginFactory {
        PluginFactory {
            registry,
            state: OnceLock::new(),
        }
    }
}

/// Bound render function and installed middleware, set together.
struct PluginState {
    render_fn: RenderFn,
    middleware: Middleware,
}

/// Plugin factory holding the lazily initialized binding.
///
/// Safe to share between threads: concurrent first activations initialize
/// exactly once and all observe the same middleware.
pub struct PluginFactory {
    registry: Arc<VariableRegistry>,
    state: OnceLock<PluginState>,
}

impl PluginFactory {
    /// Activate the plugin for `compiler`.
    ///
    /// The first call binds `compiler`'s render function and installs an
    /// [`InjectionHandler`] with `options`. Later calls return the stored
    /// middleware and ignore both arguments, including a different compiler.
    ///
    /// The hook always answers to the registry's directive, the one its
    /// fragments were cycle-checked under. A different `options.directive`
    /// is replaced with a warning.
    pub fn activate<C>(&self, compiler: &C, options: &HookOptions) -> Middleware
    where
        C: HostCompiler + ?Sized,
    {
        let state = self.state.get_or_init(|| {
            let mut options = options.clone();
            if options.directive != self.registry.directive() {
                tracing::warn!(
                    requested = %options.directive,
                    registry = %self.registry.directive(),
                    "Hook directive differs from registry directive, using registry directive"
                );
                self.registry.directive().clone_into(&mut options.directive);
            }

            let render_fn = compiler.render_fn();
            let handler = InjectionHandler::new(Arc::clone(&self.registry), render_fn.clone());
            let middleware = compiler.hook(options, Arc::new(handler));

            tracing::info!(
                directive = %self.registry.directive(),
                variables = self.registry.len(),
                "Injection plugin initialized"
            );

            PluginState {
                render_fn,
                middleware,
            }
        });

        state.middleware.clone()
    }

    /// Check if the plugin has been activated.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state.get().is_some()
    }

    /// Render function bound on first activation.
    #[must_use]
    pub fn render_fn(&self) -> Option<&RenderFn> {
        self.state.get().map(|state| &state.render_fn)
    }

    /// Middleware installed on first activation.
    #[must_use]
    pub fn middleware(&self) -> Option<&Middleware> {
        self.state.get().map(|state| &state.middleware)
    }

    /// Registry the plugin resolves keys against.
    #[must_use]
    pub fn registry(&self) -> &Arc<VariableRegistry> {
        &self.registry
    }
}
