//! Inline directive trait.
//!
//! Inline directives use single-colon syntax: `:name[content]{attrs}`

use super::{DirectiveArgs, DirectiveContext, DirectiveOutput};

/// Handler for inline directives: `:name[content]{attrs}`
///
/// Inline directives appear within text flow, e.g. `Say: :embed[greeting]`.
/// They are processed during the preprocessing phase before pulldown-cmark parsing.
///
/// # Thread Safety
///
/// Handlers implement `Send` only (not `Sync`) since each compile pass gets its
/// own processor instance.
pub trait InlineDirective: Send {
    /// Directive name matched against `:name[...]`.
    fn name(&self) -> &str;

    /// Process the inline directive.
    fn process(&mut self, args: DirectiveArgs, ctx: &DirectiveContext) -> DirectiveOutput;

    /// Warnings generated during processing.
    fn warnings(&self) -> &[String] {
        &[]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Upper;

    impl InlineDirective for Upper {
        fn name(&self) -> &'static str {
            "upper"
        }

        fn process(&mut self, args: DirectiveArgs, _ctx: &DirectiveContext) -> DirectiveOutput {
            DirectiveOutput::html(args.content.to_uppercase())
        }
    }

    #[test]
    fn test_inline_directive() {
        let mut upper = Upper;
        let ctx = DirectiveContext { line: 1, depth: 0 };

        let output = upper.process(DirectiveArgs::parse("abc", ""), &ctx);

        assert_eq!(output, DirectiveOutput::Html("ABC".to_owned()));
        assert_eq!(upper.name(), "upper");
        assert!(upper.warnings().is_empty());
    }
}
