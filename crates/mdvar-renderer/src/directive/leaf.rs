//! Leaf directive trait.
//!
//! Leaf directives use double-colon syntax: `::name[content]{attrs}`

use super::{DirectiveArgs, DirectiveContext, DirectiveOutput};

/// Handler for leaf directives: `::name[content]{attrs}`
///
/// Leaf directives stand for a whole block, typically on a line of their own:
///
/// ```markdown
/// # Release notes
///
/// ::embed[changelog]
/// ```
///
/// They usually return [`DirectiveOutput::Fragment`] for rendered HTML or
/// [`DirectiveOutput::Markdown`] for content that should go through the full
/// pipeline.
///
/// # Thread Safety
///
/// Handlers implement `Send` only (not `Sync`) since each compile pass gets its
/// own processor instance.
pub trait LeafDirective: Send {
    /// Directive name matched against `::name[...]`.
    fn name(&self) -> &str;

    /// Process the leaf directive.
    fn process(&mut self, args: DirectiveArgs, ctx: &DirectiveContext) -> DirectiveOutput;

    /// Warnings generated during processing.
    ///
    /// Override this method if your directive can produce warnings.
    fn warnings(&self) -> &[String] {
        &[]
    }
}
