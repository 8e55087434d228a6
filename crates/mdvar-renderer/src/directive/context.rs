//! Directive processing context.

/// Source location handed to directive handlers.
///
/// Created by [`DirectiveProcessor`](super::DirectiveProcessor) for each
/// directive it dispatches.
///
/// # Example
///
/// ```
/// use mdvar_renderer::directive::DirectiveContext;
///
/// let ctx = DirectiveContext { line: 3, depth: 0 };
/// assert_eq!(ctx.location(), "line 3");
///
/// let nested = DirectiveContext { line: 1, depth: 2 };
/// assert_eq!(nested.location(), "line 1 (depth 2)");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirectiveContext {
    /// Line number where the directive appears (1-indexed).
    ///
    /// Inside spliced markdown this is the line within the spliced text.
    pub line: usize,
    /// Markdown splice depth (0 for the document itself).
    pub depth: usize,
}

impl DirectiveContext {
    /// Human-readable location prefix for warnings.
    #[must_use]
    pub fn location(&self) -> String {
        if self.depth == 0 {
            format!("line {}", self.line)
        } else {
            format!("line {} (depth {})", self.line, self.depth)
        }
    }
}
