//! Directive syntax and processing for injection tokens.
//!
//! This module handles the generic `CommonMark` directive syntax used for
//! injection tokens: inline `:name[content]{attrs}` and leaf
//! `::name[content]{attrs}`.
//!
//! # Architecture
//!
//! Directives are processed in two phases:
//!
//! 1. **Preprocessing** ([`DirectiveProcessor::process`]): replaces directive
//!    syntax with handler output before pulldown-cmark sees the document.
//!    Rendered fragments are parked in a [`Replacements`] table and replaced by
//!    opaque placeholders so the markdown parser cannot alter them.
//!
//! 2. **Post-processing** ([`DirectiveProcessor::post_process`]): swaps the
//!    placeholders for the parked HTML in one pass over the rendered output.
//!
//! # Example
//!
//! ```
//! use mdvar_renderer::directive::{
//!     DirectiveArgs, DirectiveContext, DirectiveOutput, DirectiveProcessor, InlineDirective,
//! };
//!
//! struct Shout;
//!
//! impl InlineDirective for Shout {
//!     fn name(&self) -> &str { "shout" }
//!
//!     fn process(&mut self, args: DirectiveArgs, _ctx: &DirectiveContext) -> DirectiveOutput {
//!         DirectiveOutput::html(format!("<b>{}</b>", args.content.to_uppercase()))
//!     }
//! }
//!
//! let mut processor = DirectiveProcessor::new().with_inline(Shout);
//! let output = processor.process("Say :shout[hi] twice.");
//! assert_eq!(output, "Say <b>HI</b> twice.");
//! ```

mod args;
mod code;
mod context;
mod inline;
mod leaf;
mod output;
mod parser;
mod processor;
mod replacements;

pub use args::DirectiveArgs;
pub use context::DirectiveContext;
pub use inline::InlineDirective;
pub use leaf::LeafDirective;
pub use output::DirectiveOutput;
pub use parser::{is_valid_directive_name, scan_references};
pub use processor::{DirectiveProcessor, DirectiveProcessorConfig};
pub use replacements::Replacements;
