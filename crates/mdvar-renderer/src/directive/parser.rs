//! Directive syntax parsing.
//!
//! Parses inline `:name[content]{attrs}` and leaf `::name[content]{attrs}`.

use super::DirectiveArgs;
use super::code::CodeRanges;

/// Parsed directive from a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ParsedDirective {
    /// Inline directive: `:name[content]{attrs}`
    Inline { name: String, args: DirectiveArgs },
    /// Leaf directive: `::name[content]{attrs}`
    Leaf { name: String, args: DirectiveArgs },
}

impl ParsedDirective {
    pub(crate) fn name(&self) -> &str {
        match self {
            Self::Inline { name, .. } | Self::Leaf { name, .. } => name,
        }
    }

    pub(crate) fn args(&self) -> &DirectiveArgs {
        match self {
            Self::Inline { args, .. } | Self::Leaf { args, .. } => args,
        }
    }
}

/// Find the first directive in a line.
///
/// Colons that don't start a valid directive (`Note: text`, `https://`,
/// `:::` fences) are skipped and scanning continues after them.
///
/// Returns the directive with its start and end byte offsets.
pub(crate) fn parse_line(line: &str) -> Option<(ParsedDirective, usize, usize)> {
    let mut offset = 0;

    while let Some(found) = line[offset..].find(':') {
        let start = offset + found;
        let colon_count = line[start..].bytes().take_while(|&b| b == b':').count();

        if colon_count <= 2
            && let Some((directive, end)) = parse_at(line, start + colon_count, colon_count)
        {
            return Some((directive, start, end));
        }

        offset = start + colon_count;
    }

    None
}

/// Parse name, brackets and braces starting right after the colons.
fn parse_at(line: &str, mut pos: usize, colon_count: usize) -> Option<(ParsedDirective, usize)> {
    let after_colons = &line[pos..];

    // Name ends at [, {, or anything that can't be part of a name
    let name_end = after_colons
        .find(|c: char| !is_name_char(c))
        .unwrap_or(after_colons.len());
    let name = &after_colons[..name_end];
    if !is_valid_directive_name(name) {
        return None;
    }
    pos += name_end;

    let (content, content_consumed) = parse_delimited(&line[pos..], '[', ']');
    pos += content_consumed;

    let (attrs_str, attrs_consumed) = parse_delimited(&line[pos..], '{', '}');
    pos += attrs_consumed;

    let args = DirectiveArgs::parse(content, attrs_str);
    let name = name.to_owned();
    let directive = if colon_count == 1 {
        ParsedDirective::Inline { name, args }
    } else {
        ParsedDirective::Leaf { name, args }
    };

    Some((directive, pos))
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

/// Check if a name is a valid directive name.
///
/// Valid names start with a letter and contain only alphanumeric characters,
/// hyphens, and underscores. Requiring a leading letter keeps times such as
/// `10:30` from reading as directives.
#[must_use]
pub fn is_valid_directive_name(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_alphabetic) && name.chars().all(is_name_char)
}

/// Parse a balanced `open ... close` group at the start of `s`.
///
/// Returns (inner text, bytes consumed); `("", 0)` when `s` doesn't start with
/// `open` or the group is unbalanced.
fn parse_delimited(s: &str, open: char, close: char) -> (&str, usize) {
    if !s.starts_with(open) {
        return ("", 0);
    }

    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return (&s[open.len_utf8()..i], i + close.len_utf8());
            }
        }
    }

    ("", 0)
}

/// Collect the keys referenced by `directive` tokens in `markdown`.
///
/// Uses the same line scanner as [`DirectiveProcessor`](super::DirectiveProcessor)
/// and skips code spans and code blocks, so every token a compile pass would
/// try to resolve is found. The markdown in a token's `default` attribute is
/// scanned too, since it is spliced when the key is missing. Keys are returned
/// in order of first appearance without duplicates.
///
/// # Example
///
/// ```
/// use mdvar_renderer::directive::scan_references;
///
/// let md = "Hi :embed[name]!\n\n::embed[footer]\n\n```\n:embed[ignored]\n```\n";
/// assert_eq!(scan_references(md, "embed"), vec!["name", "footer"]);
/// ```
#[must_use]
pub fn scan_references(markdown: &str, directive: &str) -> Vec<String> {
    let mut keys = Vec::new();
    collect_references(markdown, directive, &mut keys);
    keys
}

fn collect_references(markdown: &str, directive: &str, keys: &mut Vec<String>) {
    let code = CodeRanges::new(markdown);
    let mut offset = 0;

    for segment in markdown.split_inclusive('\n') {
        let mut pos = 0;
        while let Some((parsed, start, end)) = parse_line(&segment[pos..]) {
            let at = offset + pos + start;
            pos += end;
            if parsed.name() != directive || code.contains(at) {
                continue;
            }

            let key = parsed.args().key();
            if !key.is_empty() && !keys.iter().any(|k| k == key) {
                keys.push(key.to_owned());
            }
            // Strictly shorter than the token, so recursion ends
            if let Some(default) = parsed.args().get("default") {
                collect_references(default, directive, keys);
            }
        }
        offset += segment.len();
    }
}
