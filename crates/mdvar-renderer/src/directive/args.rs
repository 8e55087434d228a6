//! Directive argument parsing.
//!
//! Parses the `[content]{key="value"}` part of a directive.

use std::collections::HashMap;

/// Parsed arguments from directive syntax.
///
/// For an injection token the bracket content is the variable key, and
/// attributes tune how that single token is resolved:
/// `:embed[greeting]{splice=markdown default="friend"}`.
///
/// # Example
///
/// ```
/// use mdvar_renderer::directive::DirectiveArgs;
///
/// let args = DirectiveArgs::parse(" greeting ", r#"splice=markdown default="hi there""#);
/// assert_eq!(args.key(), "greeting");
/// assert_eq!(args.get("splice"), Some("markdown"));
/// assert_eq!(args.get("default"), Some("hi there"));
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DirectiveArgs {
    /// Content from brackets: `[content]` (empty string if not provided).
    pub content: String,
    /// Key-value attributes: `{key="value"}`.
    pub attrs: HashMap<String, String>,
}

impl DirectiveArgs {
    /// Parse bracket content and the attribute string (without braces).
    ///
    /// Attributes accept `key="value"`, `key='value'` and `key=value`.
    /// Anything else in the braces is ignored.
    #[must_use]
    pub fn parse(content: &str, attrs_str: &str) -> Self {
        let mut args = Self {
            content: content.to_owned(),
            ..Default::default()
        };

        let mut remaining = attrs_str.trim();
        while !remaining.is_empty() {
            if let Some((key, value, rest)) = parse_key_value(remaining) {
                args.attrs.insert(key.to_owned(), value.to_owned());
                remaining = rest.trim_start();
            } else {
                // Skip the unrecognized word
                let skip = remaining
                    .find(char::is_whitespace)
                    .unwrap_or(remaining.len());
                remaining = remaining[skip..].trim_start();
            }
        }

        args
    }

    /// Bracket content with surrounding whitespace removed.
    #[must_use]
    pub fn key(&self) -> &str {
        self.content.trim()
    }

    /// Get an attribute value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }
}

fn parse_key_value(s: &str) -> Option<(&str, &str, &str)> {
    let word_end = s.find(char::is_whitespace).unwrap_or(s.len());
    let eq_pos = s[..word_end].find('=')?;
    let key = &s[..eq_pos];
    if key.is_empty() {
        return None;
    }

    let after_eq = &s[eq_pos + 1..];
    for quote in ['"', '\''] {
        if let Some(stripped) = after_eq.strip_prefix(quote) {
            let end_quote = stripped.find(quote)?;
            return Some((key, &stripped[..end_quote], &stripped[end_quote + 1..]));
        }
    }

    let end = after_eq.find(char::is_whitespace).unwrap_or(after_eq.len());
    Some((key, &after_eq[..end], &after_eq[end..]))
}
