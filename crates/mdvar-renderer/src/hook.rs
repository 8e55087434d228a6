//! Extension hook for injection tokens.
//!
//! A [`HostCompiler`] accepts a [`TokenHandler`] together with [`HookOptions`]
//! and answers with a [`Middleware`] handle. From then on every compile pass
//! routes the matching directive tokens to the handler.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::compiler::{RenderFn, RenderResult};
use crate::directive::{
    DirectiveArgs, DirectiveContext, DirectiveOutput, InlineDirective, LeafDirective,
};
use crate::escape_html;

/// Default directive name for injection tokens: `:embed[key]`.
pub(crate) const DEFAULT_DIRECTIVE: &str = "embed";

/// How a resolved fragment is placed into the document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SpliceMode {
    /// Render the fragment on its own and splice the HTML at the token.
    #[default]
    Html,
    /// Splice the fragment's markdown into the document before parsing.
    ///
    /// Inline fragments then flow into the surrounding paragraph instead of
    /// opening a block of their own.
    Markdown,
}

impl FromStr for SpliceMode {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "html" => Ok(Self::Html),
            "markdown" | "md" => Ok(Self::Markdown),
            _ => Err(ParseOptionError::new("splice mode", s, "html, markdown")),
        }
    }
}

/// What an unresolved token renders as.
///
/// A warning is reported in every case.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum MissingPolicy {
    /// Render nothing.
    #[default]
    Empty,
    /// Render an HTML comment naming the key.
    Comment,
    /// Leave the token text as written.
    Source,
}

impl FromStr for MissingPolicy {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "empty" => Ok(Self::Empty),
            "comment" => Ok(Self::Comment),
            "source" => Ok(Self::Source),
            _ => Err(ParseOptionError::new(
                "missing policy",
                s,
                "empty, comment, source",
            )),
        }
    }
}

/// Error parsing a [`SpliceMode`] or [`MissingPolicy`] from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {what} '{value}' (expected one of: {expected})")]
pub struct ParseOptionError {
    what: &'static str,
    value: String,
    expected: &'static str,
}

impl ParseOptionError {
    fn new(what: &'static str, value: &str, expected: &'static str) -> Self {
        Self {
            what,
            value: value.to_owned(),
            expected,
        }
    }
}

/// Options for [`HostCompiler::hook`].
///
/// `directive` is the token matcher: the handler receives every
/// `:directive[key]` and `::directive[key]` token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HookOptions {
    /// Directive name the hook answers to.
    pub directive: String,
    /// Default splice mode; a token may override it with `{splice=...}`.
    pub splice: SpliceMode,
    /// Fallback for unresolved keys.
    pub on_missing: MissingPolicy,
}

impl Default for HookOptions {
    fn default() -> Self {
        Self::new(DEFAULT_DIRECTIVE)
    }
}

impl HookOptions {
    /// Options for `directive` with default splice mode and fallback.
    #[must_use]
    pub fn new(directive: impl Into<String>) -> Self {
        Self {
            directive: directive.into(),
            splice: SpliceMode::default(),
            on_missing: MissingPolicy::default(),
        }
    }

    /// Set the default splice mode.
    #[must_use]
    pub fn with_splice(mut self, splice: SpliceMode) -> Self {
        self.splice = splice;
        self
    }

    /// Set the unresolved-key fallback.
    #[must_use]
    pub fn with_on_missing(mut self, on_missing: MissingPolicy) -> Self {
        self.on_missing = on_missing;
        self
    }
}

/// Failure to resolve a token.
///
/// Recoverable: the compiler reports it as a warning and keeps going.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// No fragment is registered under the key.
    #[error("unresolved variable '{0}'")]
    Unresolved(String),
    /// The token carries no key: `:embed[]`.
    #[error("empty variable reference")]
    EmptyKey,
}

/// Resolves injection token keys.
///
/// Shared by every compile pass that runs the hook, hence `Sync`.
pub trait TokenHandler: Send + Sync {
    /// Markdown source registered under `key`.
    fn source(&self, key: &str) -> Result<String, TokenError>;

    /// Resolve `key` to rendered HTML.
    fn resolve(&self, key: &str) -> Result<RenderResult, TokenError>;
}

/// Capability surface a markdown compiler offers to plugins.
///
/// [`MarkdownCompiler`](crate::MarkdownCompiler) is the real implementation;
/// tests can substitute a minimal fake.
pub trait HostCompiler {
    /// Bound render entry point: markdown in, HTML out, full grammar
    /// including installed hooks.
    fn render_fn(&self) -> RenderFn;

    /// Install `handler` for tokens matching `options` on every subsequent
    /// compile pass.
    fn hook(&self, options: HookOptions, handler: Arc<dyn TokenHandler>) -> Middleware;
}

/// Handle to an installed hook.
///
/// Cloning is cheap and clones compare equal under [`ptr_eq`](Self::ptr_eq).
#[derive(Clone)]
pub struct Middleware {
    inner: Arc<MiddlewareInner>,
}

struct MiddlewareInner {
    options: HookOptions,
    handler: Arc<dyn TokenHandler>,
}

impl Middleware {
    /// Create a handle for `handler` under `options`.
    #[must_use]
    pub fn new(options: HookOptions, handler: Arc<dyn TokenHandler>) -> Self {
        Self {
            inner: Arc::new(MiddlewareInner { options, handler }),
        }
    }

    /// Options the hook was installed with.
    #[must_use]
    pub fn options(&self) -> &HookOptions {
        &self.inner.options
    }

    /// The installed token handler.
    #[must_use]
    pub fn handler(&self) -> &Arc<dyn TokenHandler> {
        &self.inner.handler
    }

    /// Whether both handles refer to the same installed hook.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Per-compile directive adapter for this hook.
    pub(crate) fn directive(&self) -> HookDirective {
        HookDirective {
            middleware: self.clone(),
            warnings: Vec::new(),
        }
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Middleware")
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

/// Runs a [`Middleware`] inside one compile pass.
///
/// Registered as both inline and leaf directive; each registration keeps its
/// own warnings.
pub(crate) struct HookDirective {
    middleware: Middleware,
    warnings: Vec<String>,
}

impl HookDirective {
    fn run(&mut self, args: &DirectiveArgs, ctx: &DirectiveContext) -> DirectiveOutput {
        let middleware = self.middleware.clone();
        let options = middleware.options();
        let key = args.key();

        let splice = match args.get("splice").map(str::parse::<SpliceMode>) {
            Some(Ok(splice)) => splice,
            Some(Err(e)) => {
                self.warnings.push(format!("{}: {e}", ctx.location()));
                options.splice
            }
            None => options.splice,
        };

        let resolved = if key.is_empty() {
            Err(TokenError::EmptyKey)
        } else {
            match splice {
                SpliceMode::Markdown => middleware.handler().source(key).map(DirectiveOutput::Markdown),
                SpliceMode::Html => middleware.handler().resolve(key).map(|result| {
                    for warning in result.warnings {
                        self.warnings
                            .push(format!("{}: in variable '{key}': {warning}", ctx.location()));
                    }
                    DirectiveOutput::Fragment(result.html)
                }),
            }
        };

        resolved.unwrap_or_else(|err| self.fallback(args, ctx, &err, options.on_missing))
    }

    fn fallback(
        &mut self,
        args: &DirectiveArgs,
        ctx: &DirectiveContext,
        err: &TokenError,
        on_missing: MissingPolicy,
    ) -> DirectiveOutput {
        if let Some(default) = args.get("default") {
            tracing::debug!(key = args.key(), line = ctx.line, "Using token default");
            return DirectiveOutput::markdown(default);
        }

        tracing::warn!(key = args.key(), line = ctx.line, error = %err, "Unresolved token");
        self.warnings.push(format!("{}: {err}", ctx.location()));

        match on_missing {
            MissingPolicy::Empty => DirectiveOutput::html(""),
            MissingPolicy::Comment => {
                DirectiveOutput::html(format!("<!-- unresolved: {} -->", escape_html(args.key())))
            }
            MissingPolicy::Source => DirectiveOutput::Skip,
        }
    }
}

impl InlineDirective for HookDirective {
    fn name(&self) -> &str {
        &self.middleware.inner.options.directive
    }

    fn process(&mut self, args: DirectiveArgs, ctx: &DirectiveContext) -> DirectiveOutput {
        self.run(&args, ctx)
    }

    fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

impl LeafDirective for HookDirective {
    fn name(&self) -> &str {
        &self.middleware.inner.options.directive
    }

    fn process(&mut self, args: DirectiveArgs, ctx: &DirectiveContext) -> DirectiveOutput {
        self.run(&args, ctx)
    }

    fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    static_assertions::assert_impl_all!(Middleware: Send, Sync);

    /// Handler that renders fragments as `<frag>{source}</frag>`.
    struct MapHandler(HashMap<&'static str, &'static str>);

    impl TokenHandler for MapHandler {
        fn source(&self, key: &str) -> Result<String, TokenError> {
            self.0
                .get(key)
                .map(|s| (*s).to_owned())
                .ok_or_else(|| TokenError::Unresolved(key.to_owned()))
        }

        fn resolve(&self, key: &str) -> Result<RenderResult, TokenError> {
            let source = self.source(key)?;
            Ok(RenderResult {
                html: format!("<frag>{source}</frag>"),
                warnings: vec!["nested".to_owned()],
            })
        }
    }

    fn hook(options: HookOptions) -> HookDirective {
        let handler = MapHandler(HashMap::from([("name", "*Ada*")]));
        Middleware::new(options, Arc::new(handler)).directive()
    }

    fn run(directive: &mut HookDirective, content: &str, attrs: &str) -> DirectiveOutput {
        let ctx = DirectiveContext { line: 2, depth: 0 };
        directive.run(&DirectiveArgs::parse(content, attrs), &ctx)
    }

    #[test]
    fn test_html_splice_returns_fragment_and_nested_warnings() {
        let mut directive = hook(HookOptions::default());

        let output = run(&mut directive, "name", "");

        assert_eq!(output, DirectiveOutput::fragment("<frag>*Ada*</frag>"));
        assert_eq!(
            InlineDirective::warnings(&directive),
            ["line 2: in variable 'name': nested"]
        );
    }

    #[test]
    fn test_markdown_splice_returns_source() {
        let mut directive = hook(HookOptions::default().with_splice(SpliceMode::Markdown));
        assert_eq!(run(&mut directive, "name", ""), DirectiveOutput::markdown("*Ada*"));
    }

    #[test]
    fn test_token_overrides_splice_mode() {
        let mut directive = hook(HookOptions::default());
        assert_eq!(
            run(&mut directive, "name", "splice=markdown"),
            DirectiveOutput::markdown("*Ada*")
        );
    }

    #[test]
    fn test_invalid_splice_attribute_warns_and_uses_default() {
        let mut directive = hook(HookOptions::default().with_splice(SpliceMode::Markdown));

        let output = run(&mut directive, "name", "splice=pdf");

        assert_eq!(output, DirectiveOutput::markdown("*Ada*"));
        let warnings = InlineDirective::warnings(&directive);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("invalid splice mode 'pdf'"));
    }

    #[test]
    fn test_missing_policies() {
        let mut empty = hook(HookOptions::default());
        assert_eq!(run(&mut empty, "nope", ""), DirectiveOutput::html(""));
        assert_eq!(
            LeafDirective::warnings(&empty),
            ["line 2: unresolved variable 'nope'"]
        );

        let mut comment = hook(HookOptions::default().with_on_missing(MissingPolicy::Comment));
        assert_eq!(
            run(&mut comment, "a->b", ""),
            DirectiveOutput::html("<!-- unresolved: a-&gt;b -->")
        );

        let mut source = hook(HookOptions::default().with_on_missing(MissingPolicy::Source));
        assert_eq!(run(&mut source, "nope", ""), DirectiveOutput::Skip);
        assert_eq!(LeafDirective::warnings(&source).len(), 1);
    }

    #[test]
    fn test_empty_key_is_reported() {
        let mut directive = hook(HookOptions::default());
        assert_eq!(run(&mut directive, "  ", ""), DirectiveOutput::html(""));
        assert_eq!(
            InlineDirective::warnings(&directive),
            ["line 2: empty variable reference"]
        );
    }

    #[test]
    fn test_default_attribute_suppresses_warning() {
        let mut directive = hook(HookOptions::default());

        let output = run(&mut directive, "nope", r#"default="friend""#);

        assert_eq!(output, DirectiveOutput::markdown("friend"));
        assert!(InlineDirective::warnings(&directive).is_empty());
    }

    #[test]
    fn test_parse_options() {
        assert_eq!("html".parse::<SpliceMode>(), Ok(SpliceMode::Html));
        assert_eq!("md".parse::<SpliceMode>(), Ok(SpliceMode::Markdown));
        assert_eq!("comment".parse::<MissingPolicy>(), Ok(MissingPolicy::Comment));
        assert!("loud".parse::<MissingPolicy>().is_err());
    }

    #[test]
    fn test_middleware_identity() {
        let handler: Arc<dyn TokenHandler> = Arc::new(MapHandler(HashMap::new()));
        let a = Middleware::new(HookOptions::default(), Arc::clone(&handler));
        let b = Middleware::new(HookOptions::default(), handler);

        assert!(a.ptr_eq(&a.clone()));
        assert!(!a.ptr_eq(&b));
        assert_eq!(a.options().directive, "embed");
    }
}
