//! Markdown compiler with a pluggable directive hook.
//!
//! This crate provides [`MarkdownCompiler`], a `CommonMark`/GFM to HTML compiler
//! built on pulldown-cmark, and the extension surface that fragment injection
//! plugs into.
//!
//! # Architecture
//!
//! A compile pass runs in three steps:
//! 1. **Preprocess**: the [`directive::DirectiveProcessor`] replaces `:name[...]`
//!    and `::name[...]` tokens with handler output.
//! 2. **Render**: pulldown-cmark turns the preprocessed markdown into HTML.
//! 3. **Post-process**: rendered fragments held back from the markdown parser
//!    are spliced into the HTML in a single pass.
//!
//! Extensions register through the [`HostCompiler`] trait: [`HostCompiler::hook`]
//! installs a [`TokenHandler`] for a directive name and returns a [`Middleware`]
//! handle, and [`HostCompiler::render_fn`] hands out a bound [`RenderFn`] that
//! compiles markdown with every installed hook.
//!
//! # Example
//!
//! ```
//! use mdvar_renderer::MarkdownCompiler;
//!
//! let compiler = MarkdownCompiler::new();
//! let result = compiler.render("# Hello\n\n**Bold** text");
//! assert!(result.html.contains("<strong>Bold</strong>"));
//! assert!(result.warnings.is_empty());
//! ```

mod compiler;
pub mod directive;
mod hook;

pub use compiler::{CompilerConfig, MarkdownCompiler, RenderFn, RenderResult};
pub use hook::{
    HookOptions, HostCompiler, Middleware, MissingPolicy, ParseOptionError, SpliceMode,
    TokenError, TokenHandler,
};

/// Escape HTML special characters in text.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
