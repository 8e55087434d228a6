//! Directive output types.

/// Output from directive processing.
///
/// - [`Html`](Self::Html): inline HTML left in the markdown for pulldown-cmark
///   to pass through
/// - [`Fragment`](Self::Fragment): already rendered HTML, held back from the
///   markdown parser and spliced in after rendering
/// - [`Markdown`](Self::Markdown): markdown spliced into the document and
///   processed recursively
/// - [`Skip`](Self::Skip): leave the directive text unchanged
///
/// # Example
///
/// ```
/// use mdvar_renderer::directive::DirectiveOutput;
///
/// let output = DirectiveOutput::fragment("<p><strong>Hello</strong></p>\n");
/// assert!(matches!(output, DirectiveOutput::Fragment(_)));
///
/// let output = DirectiveOutput::markdown("**Hello**");
/// assert!(matches!(output, DirectiveOutput::Markdown(_)));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DirectiveOutput {
    /// Inline HTML that pulldown-cmark passes through unchanged.
    Html(String),
    /// Rendered HTML spliced after the markdown pass.
    ///
    /// Block-level or multi-line HTML must use this variant: left in the
    /// markdown it would be re-parsed and could break the surrounding block.
    Fragment(String),
    /// Markdown that goes through the full pipeline in place of the directive.
    Markdown(String),
    /// Don't handle this directive (pass through unchanged).
    Skip,
}

impl DirectiveOutput {
    /// Create an inline HTML output.
    #[must_use]
    pub fn html(html: impl Into<String>) -> Self {
        Self::Html(html.into())
    }

    /// Create a rendered fragment output.
    #[must_use]
    pub fn fragment(html: impl Into<String>) -> Self {
        Self::Fragment(html.into())
    }

    /// Create a markdown output for recursive processing.
    #[must_use]
    pub fn markdown(markdown: impl Into<String>) -> Self {
        Self::Markdown(markdown.into())
    }
}
