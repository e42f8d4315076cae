//! Byte-range source editing.
//!
//! Rewrites replace specifier bytes in place, leaving every other byte of
//! the file untouched: quote style, whitespace, comments. Replacements
//! never contain newlines, so line structure is preserved and the source
//! map is a per-line identity mapping.

use std::ops::Range;

/// An overwrite-only editor over one source text.
#[derive(Debug)]
pub struct SourceEditor<'a> {
    source: &'a str,
    edits: Vec<(Range<usize>, String)>,
}

impl<'a> SourceEditor<'a> {
    #[must_use]
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            edits: Vec::new(),
        }
    }

    /// Replace the bytes in `range` with `replacement`.
    ///
    /// Ranges must not overlap and replacements must not introduce line
    /// breaks; both would invalidate the line-identity map.
    pub fn overwrite(&mut self, range: Range<usize>, replacement: impl Into<String>) {
        let replacement = replacement.into();
        debug_assert!(range.end <= self.source.len());
        debug_assert!(!replacement.contains('\n'));
        self.edits.push((range, replacement));
    }

    /// True once at least one overwrite was recorded.
    #[must_use]
    pub fn has_edits(&self) -> bool {
        !self.edits.is_empty()
    }

    /// Render the edited source.
    #[must_use]
    pub fn finish(mut self) -> String {
        self.edits.sort_by_key(|(range, _)| range.start);
        let mut out = String::with_capacity(self.source.len());
        let mut cursor = 0;
        for (range, replacement) in &self.edits {
            out.push_str(&self.source[cursor..range.start]);
            out.push_str(replacement);
            cursor = range.end;
        }
        out.push_str(&self.source[cursor..]);
        out
    }

    /// Position-preserving source map for the edited output.
    ///
    /// Every output line maps to the same input line at column 0, which is
    /// exact for overwrite-only edits that never cross a line break.
    #[must_use]
    pub fn generate_map(&self, file: &str) -> String {
        let lines = self.source.lines().count().max(1);
        let mut mappings = String::from("AAAA");
        for _ in 1..lines {
            // [0, 0, 1, 0]: next generated line → next original line.
            mappings.push_str(";AACA");
        }
        serde_json::json!({
            "version": 3,
            "sources": [file],
            "names": [],
            "mappings": mappings,
        })
        .to_string()
    }
}
