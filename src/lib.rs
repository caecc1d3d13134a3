//! An editable plain-text document engine.
//!
//! The [`Document`] facade owns four cooperating parts:
//!
//! - a piece-table content store ([`model::piece_table::PieceTable`])
//! - a derived line-boundary index ([`model::line_index::LineIndex`])
//! - a registry of edit-stable positions ([`model::marker::MarkerList`])
//! - an invertible edit history ([`model::event::EditLog`])
//!
//! Every mutation flows through one pipeline: content, then line index, then
//! markers, then history, then change listeners. Undo and redo replay the
//! stored inverse edits through the same pipeline, so the engine behaves
//! exactly like a flat string with trivial line splitting, for any
//! interleaving of edits, position churn and history traversal.
//!
//! Offsets are byte offsets into UTF-8 text. The document is not internally
//! synchronized; the owner serializes access.

pub mod document;
pub mod model;

pub use document::{Document, DocumentChange, LineDelta, ListenerId, Position};
pub use model::event::{Edit, EditLog, LoggedEdit, UndoUnit};
pub use model::line_index::LineIndex;
pub use model::marker::{Bias, MarkerId, MarkerList};
pub use model::piece_table::PieceTable;

/// Errors surfaced by document operations.
///
/// Out-of-range requests never partially apply: the failing call leaves the
/// document untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// An offset/length pair fell outside `[0, len]`.
    BadOffset {
        offset: usize,
        len: usize,
        doc_len: usize,
    },

    /// A line index was at or past the line count.
    BadLine { line: usize, line_count: usize },
}

impl std::fmt::Display for DocumentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadOffset {
                offset,
                len,
                doc_len,
            } => write!(
                f,
                "range {}..{} out of bounds for document of length {}",
                offset,
                offset + len,
                doc_len
            ),
            Self::BadLine { line, line_count } => {
                write!(f, "line {line} out of bounds ({line_count} lines)")
            }
        }
    }
}

impl std::error::Error for DocumentError {}
