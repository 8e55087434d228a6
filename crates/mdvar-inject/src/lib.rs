//! Variable injection for mdvar.
//!
//! Named markdown fragments are registered once in a [`VariableRegistry`].
//! [`InjectionPlugin::create`] turns the registry into a [`PluginFactory`]
//! which, on its first activation against a host compiler, binds the
//! compiler's render function and installs an [`InjectionHandler`] for
//! injection tokens. Every later activation returns the same middleware.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use mdvar_inject::{InjectionPlugin, VariableRegistry};
//! use mdvar_renderer::{HookOptions, MarkdownCompiler};
//!
//! let registry = VariableRegistry::new([("greeting", "**Hello**")])?;
//! let factory = InjectionPlugin::create(Arc::new(registry));
//!
//! let compiler = MarkdownCompiler::new();
//! factory.activate(&compiler, &HookOptions::default());
//!
//! let result = compiler.render("Say: :embed[greeting]");
//! assert!(result.html.contains("<strong>Hello</strong>"));
//! # Ok::<(), mdvar_inject::RegistryError>(())
//! ```

mod handler;
mod plugin;
mod registry;

pub use handler::InjectionHandler;
pub use plugin::{InjectionPlugin, PluginFactory};
pub use registry::{RegistryError, UnresolvedKey, VariableRegistry};
