//! Directive processor.
//!
//! Handles preprocessing (before pulldown-cmark) and post-processing (after rendering).

use super::code::CodeRanges;
use super::parser::{ParsedDirective, parse_line};
use super::{DirectiveContext, DirectiveOutput, InlineDirective, LeafDirective, Replacements};

/// Configuration for the directive processor.
#[derive(Clone, Debug)]
pub struct DirectiveProcessorConfig {
    /// Maximum markdown splice depth.
    ///
    /// Bounds recursion when a handler returns [`DirectiveOutput::Markdown`]
    /// that contains further directives.
    ///
    /// Default: 10
    pub max_depth: usize,
}

impl Default for DirectiveProcessorConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectiveProcessorConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self { max_depth: 10 }
    }

    /// Set the maximum markdown splice depth.
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

/// Processor for inline and leaf directives.
///
/// One processor serves one compile pass: it collects parked fragments and
/// warnings for that document only.
pub struct DirectiveProcessor {
    config: DirectiveProcessorConfig,
    inline_handlers: Vec<Box<dyn InlineDirective>>,
    leaf_handlers: Vec<Box<dyn LeafDirective>>,
    replacements: Replacements,
    warnings: Vec<String>,
}

impl Default for DirectiveProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectiveProcessor {
    /// Create a new directive processor with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DirectiveProcessorConfig::default())
    }

    /// Create a new directive processor with custom configuration.
    #[must_use]
    pub fn with_config(config: DirectiveProcessorConfig) -> Self {
        Self {
            config,
            inline_handlers: Vec::new(),
            leaf_handlers: Vec::new(),
            replacements: Replacements::new(),
            warnings: Vec::new(),
        }
    }

    /// Register an inline directive handler.
    #[must_use]
    pub fn with_inline<D: InlineDirective + 'static>(mut self, handler: D) -> Self {
        self.inline_handlers.push(Box::new(handler));
        self
    }

    /// Register a leaf directive handler.
    #[must_use]
    pub fn with_leaf<D: LeafDirective + 'static>(mut self, handler: D) -> Self {
        self.leaf_handlers.push(Box::new(handler));
        self
    }

    /// Preprocess markdown, replacing directives with handler output.
    ///
    /// When a directive returns [`DirectiveOutput::Markdown`], the returned content
    /// is recursively processed (up to `max_depth` levels).
    #[must_use]
    pub fn process(&mut self, input: &str) -> String {
        self.process_with_depth(input, 0)
    }

    fn process_with_depth(&mut self, input: &str, depth: usize) -> String {
        if depth > self.config.max_depth {
            self.warnings.push(format!(
                "Maximum splice depth ({}) exceeded",
                self.config.max_depth
            ));
            return String::new();
        }

        let code = CodeRanges::new(input);
        let mut output = String::with_capacity(input.len());
        let mut offset = 0;

        for (idx, segment) in input.split_inclusive('\n').enumerate() {
            let line = segment.trim_end_matches(['\n', '\r']);
            let ctx = DirectiveContext {
                line: idx + 1,
                depth,
            };
            let processed = self.process_line(line, offset, &code, &ctx);
            output.push_str(&processed);

            // Preserve line endings
            output.push_str(&segment[line.len()..]);
            offset += segment.len();
        }

        output
    }

    fn process_line(
        &mut self,
        line: &str,
        line_offset: usize,
        code: &CodeRanges,
        ctx: &DirectiveContext,
    ) -> String {
        let mut result = String::with_capacity(line.len());
        let mut pos = 0;

        while let Some((directive, start, end)) = parse_line(&line[pos..]) {
            let (start, end) = (pos + start, pos + end);
            result.push_str(&line[pos..start]);
            let token = &line[start..end];

            if code.contains(line_offset + start) {
                result.push_str(token);
                pos = end;
                continue;
            }

            match self.dispatch(directive, ctx) {
                DirectiveOutput::Html(html) => result.push_str(&html),
                DirectiveOutput::Fragment(html) => {
                    let placeholder = self.replacements.park(html);
                    result.push_str(&placeholder);
                }
                DirectiveOutput::Markdown(md) => {
                    let processed = self.process_with_depth(&md, ctx.depth + 1);
                    // Spliced text stays on the directive's line when it is a single line
                    result.push_str(processed.strip_suffix('\n').unwrap_or(&processed));
                }
                DirectiveOutput::Skip => result.push_str(token),
            }

            pos = end;
        }

        result.push_str(&line[pos..]);
        result
    }

    fn dispatch(&mut self, directive: ParsedDirective, ctx: &DirectiveContext) -> DirectiveOutput {
        match directive {
            ParsedDirective::Inline { name, args } => self
                .inline_handlers
                .iter_mut()
                .find(|h| h.name() == name)
                .map_or(DirectiveOutput::Skip, |h| h.process(args, ctx)),
            ParsedDirective::Leaf { name, args } => self
                .leaf_handlers
                .iter_mut()
                .find(|h| h.name() == name)
                .map_or(DirectiveOutput::Skip, |h| h.process(args, ctx)),
        }
    }

    /// Splice parked fragments into rendered HTML.
    pub fn post_process(&mut self, html: &mut String) {
        std::mem::take(&mut self.replacements).apply(html);
    }

    /// Get all warnings generated during processing.
    ///
    /// Includes warnings from the processor itself and from all handlers.
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        let mut all_warnings = self.warnings.clone();

        for handler in &self.inline_handlers {
            all_warnings.extend(handler.warnings().iter().cloned());
        }
        for handler in &self.leaf_handlers {
            all_warnings.extend(handler.warnings().iter().cloned());
        }

        all_warnings
    }
}
