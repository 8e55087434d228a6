//! Markdown compiler with hook registration.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, Weak};

use pulldown_cmark::{Options, Parser, html};

use crate::directive::{DirectiveProcessor, DirectiveProcessorConfig};
use crate::hook::{HookOptions, HostCompiler, Middleware, TokenHandler};

/// Result of rendering markdown.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderResult {
    /// Rendered HTML.
    pub html: String,
    /// Warnings generated during conversion (e.g., unresolved variables).
    pub warnings: Vec<String>,
}

/// Compiler settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Enable GitHub Flavored Markdown (tables, strikethrough, task lists).
    ///
    /// Default: true
    pub gfm: bool,
    /// Maximum markdown splice depth per compile pass.
    ///
    /// Default: 10
    pub max_depth: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            gfm: true,
            max_depth: DirectiveProcessorConfig::default().max_depth,
        }
    }
}

impl CompilerConfig {
    /// Enable or disable GFM extensions.
    #[must_use]
    pub fn with_gfm(mut self, enabled: bool) -> Self {
        self.gfm = enabled;
        self
    }

    /// Set the maximum markdown splice depth.
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

/// Bound render entry point handed out by [`HostCompiler::render_fn`].
///
/// Cheap to clone; clones compare equal under [`ptr_eq`](Self::ptr_eq).
#[derive(Clone)]
pub struct RenderFn(Arc<dyn Fn(&str) -> RenderResult + Send + Sync>);

impl RenderFn {
    /// Wrap a render function.
    pub fn new<F>(render: F) -> Self
    where
        F: Fn(&str) -> RenderResult + Send + Sync + 'static,
    {
        Self(Arc::new(render))
    }

    /// Render `markdown` to HTML.
    #[must_use]
    pub fn render(&self, markdown: &str) -> RenderResult {
        (self.0)(markdown)
    }

    /// Whether both handles wrap the same function.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for RenderFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RenderFn").finish_non_exhaustive()
    }
}

/// `CommonMark`/GFM to HTML compiler with installable token hooks.
///
/// Clones share configuration and installed hooks. A compile pass never holds
/// the hook lock while handlers run, so handlers may call back into the
/// compiler through a [`RenderFn`].
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use mdvar_renderer::{
///     HookOptions, HostCompiler, MarkdownCompiler, RenderResult, TokenError, TokenHandler,
/// };
///
/// struct Shout;
///
/// impl TokenHandler for Shout {
///     fn source(&self, key: &str) -> Result<String, TokenError> {
///         Ok(format!("**{}**", key.to_uppercase()))
///     }
///
///     fn resolve(&self, key: &str) -> Result<RenderResult, TokenError> {
///         Ok(RenderResult {
///             html: format!("<b>{}</b>", key.to_uppercase()),
///             warnings: Vec::new(),
///         })
///     }
/// }
///
/// let compiler = MarkdownCompiler::new();
/// compiler.hook(HookOptions::new("shout"), Arc::new(Shout));
///
/// let result = compiler.render("Say :shout[hi]");
/// assert_eq!(result.html, "<p>Say <b>HI</b></p>\n");
/// ```
#[derive(Clone, Default)]
pub struct MarkdownCompiler {
    core: Arc<CompilerCore>,
}

#[derive(Default)]
struct CompilerCore {
    config: CompilerConfig,
    hooks: RwLock<Vec<Middleware>>,
}

impl MarkdownCompiler {
    /// Create a compiler with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a compiler with custom configuration.
    #[must_use]
    pub fn with_config(config: CompilerConfig) -> Self {
        Self {
            core: Arc::new(CompilerCore {
                config,
                hooks: RwLock::default(),
            }),
        }
    }

    /// Compiler configuration.
    #[must_use]
    pub fn config(&self) -> &CompilerConfig {
        &self.core.config
    }

    /// Snapshot of installed hooks, in installation order.
    #[must_use]
    pub fn hooks(&self) -> Vec<Middleware> {
        self.core.hooks()
    }

    /// Compile markdown to HTML with every installed hook.
    #[must_use]
    pub fn render(&self, markdown: &str) -> RenderResult {
        self.core.render(markdown)
    }
}

impl CompilerCore {
    fn hooks(&self) -> Vec<Middleware> {
        self.hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn parser_options(&self) -> Options {
        if self.config.gfm {
            Options::ENABLE_TABLES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS
                | Options::ENABLE_GFM
        } else {
            Options::empty()
        }
    }

    fn render(&self, markdown: &str) -> RenderResult {
        let hooks = self.hooks();

        let config = DirectiveProcessorConfig::new().with_max_depth(self.config.max_depth);
        let mut processor = hooks.iter().fold(
            DirectiveProcessor::with_config(config),
            |processor, hook| {
                processor
                    .with_inline(hook.directive())
                    .with_leaf(hook.directive())
            },
        );

        let preprocessed = processor.process(markdown);

        let mut html = String::with_capacity(preprocessed.len() * 3 / 2);
        html::push_html(&mut html, Parser::new_ext(&preprocessed, self.parser_options()));
        processor.post_process(&mut html);

        let warnings = processor.warnings();
        tracing::debug!(
            bytes = markdown.len(),
            hooks = hooks.len(),
            warnings = warnings.len(),
            "Compiled markdown"
        );

        RenderResult { html, warnings }
    }
}

impl HostCompiler for MarkdownCompiler {
    /// The returned function holds a weak reference: it does not keep the
    /// compiler alive, and renders nothing with a warning once the compiler
    /// and all its clones are dropped.
    fn render_fn(&self) -> RenderFn {
        let core: Weak<CompilerCore> = Arc::downgrade(&self.core);
        RenderFn::new(move |markdown| match core.upgrade() {
            Some(core) => core.render(markdown),
            None => RenderResult {
                html: String::new(),
                warnings: vec!["Compiler dropped before render".to_owned()],
            },
        })
    }

    fn hook(&self, options: HookOptions, handler: Arc<dyn TokenHandler>) -> Middleware {
        let middleware = Middleware::new(options, handler);
        let mut hooks = self
            .core
            .hooks
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let directive = &middleware.options().directive;
        if hooks.iter().any(|h| &h.options().directive == directive) {
            tracing::warn!(directive = %directive, "Directive already hooked, first hook wins");
        }
        hooks.push(middleware.clone());
        tracing::debug!(directive = %directive, "Installed token hook");

        middleware
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::hook::{MissingPolicy, SpliceMode, TokenError};

    static_assertions::assert_impl_all!(MarkdownCompiler: Send, Sync, Clone);
    static_assertions::assert_impl_all!(RenderFn: Send, Sync, Clone);

    /// Handler rendering fragments through a bound compiler.
    struct Fragments {
        sources: HashMap<String, String>,
        render: RenderFn,
    }

    impl TokenHandler for Fragments {
        fn source(&self, key: &str) -> Result<String, TokenError> {
            self.sources
                .get(key)
                .cloned()
                .ok_or_else(|| TokenError::Unresolved(key.to_owned()))
        }

        fn resolve(&self, key: &str) -> Result<RenderResult, TokenError> {
            Ok(self.render.render(&self.source(key)?))
        }
    }

    fn compiler_with(entries: &[(&str, &str)], options: HookOptions) -> MarkdownCompiler {
        let compiler = MarkdownCompiler::new();
        let handler = Fragments {
            sources: entries
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
            render: compiler.render_fn(),
        };
        compiler.hook(options, Arc::new(handler));
        compiler
    }

    #[test]
    fn test_plain_markdown() {
        let result = MarkdownCompiler::new().render("# Title\n\nSome *text*.\n");

        assert_eq!(result.html, "<h1>Title</h1>\n<p>Some <em>text</em>.</p>\n");
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_gfm_toggle() {
        let input = "~~gone~~";

        let gfm = MarkdownCompiler::new().render(input);
        assert_eq!(gfm.html, "<p><del>gone</del></p>\n");

        let plain = MarkdownCompiler::with_config(CompilerConfig::default().with_gfm(false))
            .render(input);
        assert_eq!(plain.html, "<p>~~gone~~</p>\n");
    }

    #[test]
    fn test_inline_token_splices_rendered_fragment() {
        let compiler = compiler_with(&[("greeting", "**Hello**")], HookOptions::default());

        let result = compiler.render("Say: :embed[greeting]");

        assert_eq!(result.html, "<p>Say: <p><strong>Hello</strong></p>\n</p>\n");
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_leaf_token_splices_block() {
        let compiler = compiler_with(
            &[("list", "- one\n- two\n")],
            HookOptions::default(),
        );

        let result = compiler.render("Items:\n\n::embed[list]\n");

        assert_eq!(
            result.html,
            "<p>Items:</p>\n<ul>\n<li>one</li>\n<li>two</li>\n</ul>\n\n"
        );
    }

    #[test]
    fn test_markdown_splice_flows_inline() {
        let compiler = compiler_with(
            &[("greeting", "**Hello**")],
            HookOptions::default().with_splice(SpliceMode::Markdown),
        );

        let result = compiler.render("Say: :embed[greeting]");

        assert_eq!(result.html, "<p>Say: <strong>Hello</strong></p>\n");
    }

    #[test]
    fn test_resolved_html_matches_direct_render() {
        let fragment = "| a | b |\n|---|---|\n| 1 | 2 |\n";
        let compiler = compiler_with(&[("table", fragment)], HookOptions::default());
        let handler = Arc::clone(compiler.hooks()[0].handler());

        let resolved = handler.resolve("table").unwrap();

        assert_eq!(resolved, compiler.render(fragment));
    }

    #[test]
    fn test_nested_tokens_resolve_through_render_fn() {
        let compiler = compiler_with(
            &[("outer", "Outer :embed[inner]"), ("inner", "*inner*")],
            HookOptions::default(),
        );

        let result = compiler.render("::embed[outer]");

        assert!(result.html.contains("<em>inner</em>"));
        assert!(result.html.contains("Outer"));
        assert!(!result.html.contains("mdvar:"));
    }

    #[test]
    fn test_nested_warnings_surface() {
        let compiler = compiler_with(&[("outer", "x :embed[ghost]")], HookOptions::default());

        let result = compiler.render("::embed[outer]");

        assert_eq!(
            result.warnings,
            vec!["line 1: in variable 'outer': line 1: unresolved variable 'ghost'"]
        );
    }

    #[test]
    fn test_missing_key_comment_fallback() {
        let compiler = compiler_with(
            &[],
            HookOptions::default().with_on_missing(MissingPolicy::Comment),
        );

        let result = compiler.render("Hi :embed[nobody]!");

        assert_eq!(result.html, "<p>Hi <!-- unresolved: nobody -->!</p>\n");
        assert_eq!(result.warnings, vec!["line 1: unresolved variable 'nobody'"]);
    }

    #[test]
    fn test_tokens_in_code_are_left_alone() {
        let compiler = compiler_with(&[("greeting", "Hello")], HookOptions::default());

        let result = compiler.render("```\n:embed[greeting]\n```\n");

        assert_eq!(result.html, "<pre><code>:embed[greeting]\n</code></pre>\n");
    }

    #[test]
    fn test_tokens_in_code_spans_are_left_alone() {
        let compiler = compiler_with(&[("greeting", "Hello")], HookOptions::default());

        let result = compiler.render("Write `:embed[greeting]` to inject.\n");

        assert_eq!(
            result.html,
            "<p>Write <code>:embed[greeting]</code> to inject.</p>\n"
        );
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_tokens_in_indented_code_are_left_alone() {
        let compiler = compiler_with(&[("greeting", "Hello")], HookOptions::default());

        let result = compiler.render("Example:\n\n    :embed[greeting]\n");

        assert_eq!(
            result.html,
            "<p>Example:</p>\n<pre><code>:embed[greeting]\n</code></pre>\n"
        );
    }

    #[test]
    fn test_placeholder_shaped_comment_in_source_is_kept() {
        let compiler = compiler_with(&[("greeting", "**Hello**")], HookOptions::default());

        let result = compiler.render("<!--mdvar:0-->\n\n::embed[greeting]\n");

        assert_eq!(
            result.html,
            "<!--mdvar:0-->\n<p><strong>Hello</strong></p>\n\n"
        );
    }

    #[test]
    fn test_default_attribute_renders_markdown() {
        let compiler = compiler_with(&[], HookOptions::default());

        let result = compiler.render(r#"Hi :embed[name]{default="*friend*"}"#);

        assert_eq!(result.html, "<p>Hi <em>friend</em></p>\n");
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_clones_share_hooks() {
        let compiler = MarkdownCompiler::new();
        let clone = compiler.clone();
        let handler = Fragments {
            sources: HashMap::new(),
            render: compiler.render_fn(),
        };

        let middleware = clone.hook(HookOptions::default(), Arc::new(handler));

        let hooks = compiler.hooks();
        assert_eq!(hooks.len(), 1);
        assert!(hooks[0].ptr_eq(&middleware));
    }

    #[test]
    fn test_render_fn_after_compiler_dropped() {
        let render = MarkdownCompiler::new().render_fn();

        let result = render.render("text");

        assert_eq!(result.html, "");
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_render_fn_identity() {
        let compiler = MarkdownCompiler::new();
        let render = compiler.render_fn();

        assert!(render.ptr_eq(&render.clone()));
        assert!(!render.ptr_eq(&compiler.render_fn()));
        assert_eq!(render.render("*a*").html, "<p><em>a</em></p>\n");
    }
}
