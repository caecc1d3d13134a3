//! Derived line-boundary index.
//!
//! Keeps a sorted vector of line-start byte offsets, updated incrementally on
//! every edit rather than re-split from the content. The first entry is
//! always 0; each later entry is the offset just past a `\n`. Lines partition
//! `[0, len]` contiguously, and the final line ends at the document length
//! whether or not a trailing break exists.

use std::ops::Range;

pub struct LineIndex {
    /// Strictly increasing; `line_starts[0] == 0` at all times.
    line_starts: Vec<usize>,
    /// Document length in bytes, tracked so the final line has an end.
    len: usize,
}

impl LineIndex {
    /// Index for an empty document: one line, `[0, 0)`.
    pub fn new() -> Self {
        Self {
            line_starts: vec![0],
            len: 0,
        }
    }

    /// Build the index by splitting `text` at line breaks.
    pub fn from_text(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self {
            line_starts,
            len: text.len(),
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Document length this index currently describes.
    pub fn total_len(&self) -> usize {
        self.len
    }

    /// Half-open byte range of line `index`.
    pub fn line_at(&self, index: usize) -> Option<Range<usize>> {
        let start = *self.line_starts.get(index)?;
        let end = match self.line_starts.get(index + 1) {
            Some(&next) => next,
            None => self.len,
        };
        Some(start..end)
    }

    /// Line containing `offset`; `offset == len` maps to the last line.
    pub fn line_of(&self, offset: usize) -> Option<usize> {
        if offset > self.len {
            return None;
        }
        Some(self.line_starts.partition_point(|&s| s <= offset) - 1)
    }

    /// Apply an insertion of `text` at `offset`.
    ///
    /// Starts strictly after the insertion point shift forward; a start at
    /// exactly `offset` keeps its place, because the inserted text lands
    /// after the break that created it. One new start appears per `\n` in
    /// `text`.
    pub fn on_insert(&mut self, offset: usize, text: &str) {
        let text_len = text.len();
        if text_len == 0 {
            return;
        }
        for s in self.line_starts.iter_mut() {
            if *s > offset {
                *s += text_len;
            }
        }
        let splice_at = self.line_starts.partition_point(|&s| s <= offset);
        let new_starts = text
            .bytes()
            .enumerate()
            .filter(|&(_, b)| b == b'\n')
            .map(|(i, _)| offset + i + 1);
        self.line_starts.splice(splice_at..splice_at, new_starts);
        self.len += text_len;
        self.debug_check();
    }

    /// Apply a removal of `len` bytes at `offset`.
    ///
    /// A start in `(offset, offset + len]` had its break deleted, which
    /// merges its line into the previous one. Later starts shift back.
    pub fn on_remove(&mut self, offset: usize, len: usize) {
        if len == 0 {
            return;
        }
        let end = offset + len;
        self.line_starts.retain(|&s| s <= offset || s > end);
        for s in self.line_starts.iter_mut() {
            if *s > end {
                *s -= len;
            }
        }
        self.len -= len;
        self.debug_check();
    }

    fn debug_check(&self) {
        debug_assert_eq!(self.line_starts.first(), Some(&0));
        debug_assert!(self.line_starts.windows(2).all(|w| w[0] < w[1]));
        debug_assert!(self.line_starts.last().is_none_or(|&s| s <= self.len));
    }
}

impl Default for LineIndex {
    fn default() -> Self {
        Self::new()
    }
}
