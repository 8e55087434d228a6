//! Code regions of a markdown document.
//!
//! Tokens inside code spans and code blocks, fenced or indented, are left as
//! written by both the processor and the reference scanner.

use std::ops::Range;

use pulldown_cmark::{Event, Parser, Tag};

/// Byte ranges of code spans and code blocks, in document order.
#[derive(Debug, Default)]
pub(crate) struct CodeRanges {
    ranges: Vec<Range<usize>>,
}

impl CodeRanges {
    /// Locate code regions with the same parser that renders the document.
    pub(crate) fn new(markdown: &str) -> Self {
        // Without a colon there is nothing to protect
        if !markdown.contains(':') {
            return Self::default();
        }

        let ranges = Parser::new(markdown)
            .into_offset_iter()
            .filter_map(|(event, range)| match event {
                Event::Code(_) | Event::Start(Tag::CodeBlock(_)) => Some(range),
                _ => None,
            })
            .collect();

        Self { ranges }
    }

    /// Check if the byte at `offset` is code.
    pub(crate) fn contains(&self, offset: usize) -> bool {
        let idx = self.ranges.partition_point(|range| range.end <= offset);
        self.ranges
            .get(idx)
            .is_some_and(|range| range.start <= offset)
    }
}
