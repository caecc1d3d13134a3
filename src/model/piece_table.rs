//! Piece-table content store.
//!
//! Text lives in two byte buffers: an immutable `original` buffer holding the
//! initial content and an append-only `add` buffer that grows with every
//! insertion. The document itself is a sequence of pieces, each referencing a
//! span of one buffer. Edits splice the piece list without copying buffer
//! data, so large documents never pay O(n) per keystroke.

use crate::DocumentError;

/// Which backing buffer a piece references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    Original,
    Add,
}

#[derive(Debug, Clone)]
struct Piece {
    buffer: BufferKind,
    /// Byte offset into the backing buffer.
    start: usize,
    /// Byte length of the span.
    len: usize,
}

/// The content store: a piece table over byte buffers.
///
/// Offsets are byte offsets. Text going in is always valid UTF-8; reads that
/// split a multi-byte character are converted lossily, matching how the rest
/// of the engine treats byte ranges.
pub struct PieceTable {
    original: Vec<u8>,
    add: Vec<u8>,
    pieces: Vec<Piece>,
    total_len: usize,
}

impl PieceTable {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            original: Vec::new(),
            add: Vec::new(),
            pieces: Vec::new(),
            total_len: 0,
        }
    }

    /// Create a store from initial content, held in the original buffer.
    pub fn from_str(text: &str) -> Self {
        let original = text.as_bytes().to_vec();
        let total_len = original.len();
        let pieces = if total_len > 0 {
            vec![Piece {
                buffer: BufferKind::Original,
                start: 0,
                len: total_len,
            }]
        } else {
            Vec::new()
        };
        Self {
            original,
            add: Vec::new(),
            pieces,
            total_len,
        }
    }

    /// Total length in bytes.
    pub fn len(&self) -> usize {
        self.total_len
    }

    pub fn is_empty(&self) -> bool {
        self.total_len == 0
    }

    /// Number of pieces currently in the table.
    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }

    fn bad_offset(&self, offset: usize, len: usize) -> DocumentError {
        DocumentError::BadOffset {
            offset,
            len,
            doc_len: self.total_len,
        }
    }

    /// Find the piece containing `offset` and the byte offset within it.
    /// `offset == len` maps to the insertion point past the last piece.
    fn split_point(&self, offset: usize) -> (usize, usize) {
        let mut pos = 0;
        for (i, piece) in self.pieces.iter().enumerate() {
            if offset < pos + piece.len {
                return (i, offset - pos);
            }
            pos += piece.len;
        }
        (self.pieces.len(), 0)
    }

    fn piece_bytes(&self, piece: &Piece) -> &[u8] {
        let src = match piece.buffer {
            BufferKind::Original => &self.original,
            BufferKind::Add => &self.add,
        };
        &src[piece.start..piece.start + piece.len]
    }

    /// Splice `text` into the sequence at `offset`.
    ///
    /// Sequential insertions at the same spot (ordinary typing) extend the
    /// previous add-piece in place instead of growing the piece list.
    pub fn insert(&mut self, offset: usize, text: &str) -> Result<(), DocumentError> {
        if offset > self.total_len {
            return Err(self.bad_offset(offset, 0));
        }
        if text.is_empty() {
            return Ok(());
        }

        let add_start = self.add.len();
        self.add.extend_from_slice(text.as_bytes());

        let (idx, within) = self.split_point(offset);
        if within == 0 {
            // Insertion at a piece boundary: coalesce with the previous piece
            // when it ends exactly where the add buffer just grew.
            if idx > 0 {
                let prev = &mut self.pieces[idx - 1];
                if prev.buffer == BufferKind::Add && prev.start + prev.len == add_start {
                    prev.len += text.len();
                    self.total_len += text.len();
                    return Ok(());
                }
            }
            self.pieces.insert(
                idx,
                Piece {
                    buffer: BufferKind::Add,
                    start: add_start,
                    len: text.len(),
                },
            );
        } else {
            let old = self.pieces[idx].clone();
            let right = Piece {
                buffer: old.buffer,
                start: old.start + within,
                len: old.len - within,
            };
            self.pieces[idx].len = within;
            self.pieces.insert(
                idx + 1,
                Piece {
                    buffer: BufferKind::Add,
                    start: add_start,
                    len: text.len(),
                },
            );
            self.pieces.insert(idx + 2, right);
        }
        self.total_len += text.len();
        Ok(())
    }

    /// Delete `len` bytes starting at `offset`, returning the removed text.
    pub fn remove(&mut self, offset: usize, len: usize) -> Result<String, DocumentError> {
        let end = offset
            .checked_add(len)
            .filter(|&e| e <= self.total_len)
            .ok_or_else(|| self.bad_offset(offset, len))?;
        if len == 0 {
            return Ok(String::new());
        }

        let removed = self.read(offset, len)?;

        let mut rebuilt = Vec::with_capacity(self.pieces.len() + 1);
        let mut pos = 0;
        for piece in &self.pieces {
            let p_start = pos;
            let p_end = pos + piece.len;
            pos = p_end;

            if p_end <= offset || p_start >= end {
                rebuilt.push(piece.clone());
                continue;
            }
            if p_start < offset {
                rebuilt.push(Piece {
                    buffer: piece.buffer,
                    start: piece.start,
                    len: offset - p_start,
                });
            }
            if p_end > end {
                rebuilt.push(Piece {
                    buffer: piece.buffer,
                    start: piece.start + (end - p_start),
                    len: p_end - end,
                });
            }
        }
        self.pieces = rebuilt;
        self.total_len -= len;
        Ok(removed)
    }

    /// Read `len` bytes starting at `offset` as a string.
    pub fn read(&self, offset: usize, len: usize) -> Result<String, DocumentError> {
        let end = offset
            .checked_add(len)
            .filter(|&e| e <= self.total_len)
            .ok_or_else(|| self.bad_offset(offset, len))?;

        let mut out = Vec::with_capacity(len);
        let mut pos = 0;
        for piece in &self.pieces {
            let p_start = pos;
            let p_end = pos + piece.len;
            pos = p_end;

            if p_end <= offset {
                continue;
            }
            if p_start >= end {
                break;
            }
            let from = offset.max(p_start) - p_start;
            let to = end.min(p_end) - p_start;
            out.extend_from_slice(&self.piece_bytes(piece)[from..to]);
        }
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// The full content as a string.
    pub fn text(&self) -> String {
        let mut out = Vec::with_capacity(self.total_len);
        for piece in &self.pieces {
            out.extend_from_slice(self.piece_bytes(piece));
        }
        String::from_utf8_lossy(&out).into_owned()
    }
}

impl Default for PieceTable {
    fn default() -> Self {
        Self::new()
    }
}
