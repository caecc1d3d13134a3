//! Shadow reference model for differential testing.
//!
//! A document is, semantically, a flat string with trivial line splitting and
//! position arithmetic. The shadow implements exactly that, as naively as
//! possible, so the property tests can compare the engine against it after
//! every operation.

use std::ops::Range;

use textdoc::Bias;

/// Flat-string reference document.
pub struct Shadow {
    pub text: String,
}

impl Shadow {
    pub fn new() -> Self {
        Self {
            text: String::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn insert(&mut self, offset: usize, text: &str) {
        self.text.insert_str(offset, text);
    }

    pub fn remove(&mut self, offset: usize, len: usize) -> String {
        let removed: String = self.text[offset..offset + len].to_string();
        self.text.replace_range(offset..offset + len, "");
        removed
    }

    /// Re-split the current text into line ranges from scratch.
    pub fn line_ranges(&self) -> Vec<Range<usize>> {
        let mut ranges = Vec::new();
        let mut start = 0;
        for (i, b) in self.text.bytes().enumerate() {
            if b == b'\n' {
                ranges.push(start..i + 1);
                start = i + 1;
            }
        }
        ranges.push(start..self.text.len());
        ranges
    }

    pub fn line_of(&self, offset: usize) -> usize {
        let ranges = self.line_ranges();
        ranges
            .iter()
            .position(|r| r.contains(&offset))
            .unwrap_or(ranges.len() - 1)
    }
}

/// The position-adjustment rule, written out independently of the engine:
/// given a position at `o` and an edit at `p` removing `removed` bytes and
/// inserting `inserted`, return the position's new offset.
pub fn adjust_offset(o: usize, bias: Bias, p: usize, removed: usize, inserted: usize) -> usize {
    if removed == 0 {
        if o > p || (o == p && bias == Bias::Forward) {
            o + inserted
        } else {
            o
        }
    } else if o >= p + removed {
        o - removed + inserted
    } else if o > p {
        p
    } else {
        o
    }
}
