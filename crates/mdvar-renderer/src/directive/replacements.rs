//! Placeholder table for rendered fragments.
//!
//! Fragments are rendered before the surrounding document is parsed. Left in the
//! markdown they would be parsed a second time, so the processor parks them
//! here and leaves an HTML comment placeholder in their place. Comments pass
//! through pulldown-cmark untouched both inline and as a block of their own.
//!
//! Each table stamps its placeholders with a random nonce, so a comment that
//! happens to look like a placeholder in the source document is left alone.

use std::fmt::Write;

use rand::RngExt;

/// Placeholder prefix. The table nonce, slot index and [`PLACEHOLDER_END`] follow.
const PLACEHOLDER_START: &str = "<!--mdvar:";
const PLACEHOLDER_END: &str = "-->";

/// Parked HTML fragments and their placeholders.
///
/// All placeholders are swapped back in a single pass over the rendered HTML
/// by [`apply`](Self::apply).
///
/// # Example
///
/// ```
/// use mdvar_renderer::directive::Replacements;
///
/// let mut replacements = Replacements::new();
/// let placeholder = replacements.park("<p><strong>Hello</strong></p>\n");
///
/// let mut html = format!("<p>Say: {placeholder}</p>\n");
/// replacements.apply(&mut html);
///
/// assert_eq!(html, "<p>Say: <p><strong>Hello</strong></p>\n</p>\n");
/// ```
#[derive(Debug)]
pub struct Replacements {
    /// `<!--mdvar:{nonce}:`, shared by every placeholder of this table.
    prefix: String,
    slots: Vec<String>,
}

impl Default for Replacements {
    fn default() -> Self {
        Self::new()
    }
}

impl Replacements {
    /// Create an empty table with a fresh nonce.
    #[must_use]
    pub fn new() -> Self {
        let nonce = rand::rng().random::<u64>();
        Self {
            prefix: format!("{PLACEHOLDER_START}{nonce:016x}:"),
            slots: Vec::new(),
        }
    }

    /// Park `html` and return the placeholder to emit in its place.
    pub fn park(&mut self, html: impl Into<String>) -> String {
        let index = self.slots.len();
        self.slots.push(html.into());
        let mut placeholder = String::with_capacity(self.prefix.len() + 8);
        placeholder.push_str(&self.prefix);
        let _ = write!(placeholder, "{index}{PLACEHOLDER_END}");
        placeholder
    }

    /// Swap every known placeholder in `html` for its parked fragment.
    ///
    /// Placeholders with an unknown index are left as they are. Consumes the
    /// table so a fragment can't be spliced twice.
    pub fn apply(self, html: &mut String) {
        let prefix = self.prefix.as_str();
        if self.slots.is_empty() || !html.contains(prefix) {
            return;
        }

        let extra: usize = self.slots.iter().map(String::len).sum();
        let mut out = String::with_capacity(html.len() + extra);
        let mut rest = html.as_str();

        while let Some(start) = rest.find(prefix) {
            out.push_str(&rest[..start]);
            let after = &rest[start + prefix.len()..];

            let slot = after.find(PLACEHOLDER_END).and_then(|end| {
                let index: usize = after[..end].parse().ok()?;
                self.slots.get(index).map(|html| (html, end))
            });

            match slot {
                Some((fragment, end)) => {
                    out.push_str(fragment);
                    rest = &after[end + PLACEHOLDER_END.len()..];
                }
                None => {
                    out.push_str(prefix);
                    rest = after;
                }
            }
        }

        out.push_str(rest);
        *html = out;
    }

    /// Check if no fragments are parked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of parked fragments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_empty_table_leaves_html() {
        let mut html = "<p><!--mdvar:0--></p>".to_owned();
        Replacements::new().apply(&mut html);
        assert_eq!(html, "<p><!--mdvar:0--></p>");
    }

    #[test]
    fn test_placeholders_are_numbered() {
        let mut replacements = Replacements::new();
        let first = replacements.park("a");
        let second = replacements.park("b");

        assert!(first.starts_with("<!--mdvar:") && first.ends_with(":0-->"));
        assert_eq!(second, first.replace(":0-->", ":1-->"));
        assert_eq!(replacements.len(), 2);
        assert!(!replacements.is_empty());
    }

    #[test]
    fn test_tables_use_distinct_nonces() {
        let a = Replacements::new().park("x");
        let b = Replacements::new().park("x");
        assert_ne!(a, b);
    }

    #[test]
    fn test_apply_multiple() {
        let mut replacements = Replacements::new();
        let first = replacements.park("<em>1</em>");
        let second = replacements.park("<em>2</em>");
        let mut html = format!("<p>{second} and {first}</p>\n{first}\n");

        replacements.apply(&mut html);

        assert_eq!(html, "<p><em>2</em> and <em>1</em></p>\n<em>1</em>\n");
    }

    #[test]
    fn test_unknown_or_malformed_placeholders_kept() {
        let mut replacements = Replacements::new();
        let known = replacements.park("ok");
        let prefix = known.trim_end_matches("0-->").to_owned();
        let mut html = format!("{prefix}7--> {prefix}x--> {known} {prefix}");

        replacements.apply(&mut html);

        assert_eq!(html, format!("{prefix}7--> {prefix}x--> ok {prefix}"));
    }

    #[test]
    fn test_author_comment_with_placeholder_shape_kept() {
        let mut replacements = Replacements::new();
        let known = replacements.park("fragment");
        let mut html = format!("<!--mdvar:0--> {known}");

        replacements.apply(&mut html);

        assert_eq!(html, "<!--mdvar:0--> fragment");
    }

    #[test]
    fn test_fragment_containing_placeholder_text_is_not_reexpanded() {
        let mut replacements = Replacements::new();
        let first = replacements.park("x");
        let mut html = replacements.park(first.clone());

        replacements.apply(&mut html);

        assert_eq!(html, first);
    }
}
