//! The document facade.
//!
//! [`Document`] owns the content store, line index, marker registry and edit
//! log, and is the only way to mutate any of them. Every edit runs one fixed
//! pipeline: validate, mutate content, update the line index, adjust markers,
//! record history, notify listeners. Undo and redo feed the stored inverse or
//! forward edits back through the same pipeline, minus the record step. Every
//! removal also snapshots the positions it displaces into the log, and the
//! traversal that reinserts the text restores those offsets exactly.
//!
//! The document is single-threaded and synchronous; nothing here blocks or
//! suspends, and concurrent mutation must be serialized by the owner.

use std::ops::Range;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::model::event::{Edit, EditLog};
use crate::model::line_index::LineIndex;
use crate::model::marker::{Bias, MarkerId, MarkerList};
use crate::model::piece_table::PieceTable;
use crate::DocumentError;

/// Structural line change caused by one edit: at `start_line`, `removed`
/// lines disappeared and `added` lines appeared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineDelta {
    pub start_line: usize,
    pub removed: usize,
    pub added: usize,
}

/// Payload delivered to change listeners after each applied edit, including
/// edits replayed by undo/redo. Fired only once the document is fully
/// consistent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChange {
    pub offset: usize,
    pub removed_len: usize,
    pub inserted_len: usize,
    pub line_delta: LineDelta,
}

/// Handle to a registered change listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(usize);

/// Handle to an edit-stable position. The document adjusts the underlying
/// marker on every edit until the holder releases it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position(MarkerId);

type Listener = Box<dyn FnMut(&DocumentChange)>;

/// A mutable text document with line tracking, stable positions and
/// transactional undo/redo.
pub struct Document {
    content: PieceTable,
    lines: LineIndex,
    markers: MarkerList,
    history: EditLog,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener_id: usize,
    version: u64,
}

impl Document {
    /// Create an empty document: length 0, one line.
    pub fn new() -> Self {
        Self {
            content: PieceTable::new(),
            lines: LineIndex::new(),
            markers: MarkerList::new(),
            history: EditLog::new(),
            listeners: Vec::new(),
            next_listener_id: 0,
            version: 0,
        }
    }

    /// Create a document with initial content. The initial text is not an
    /// edit: it is not undoable and no notification fires.
    pub fn from_str(text: &str) -> Self {
        Self {
            content: PieceTable::from_str(text),
            lines: LineIndex::from_text(text),
            markers: MarkerList::new(),
            history: EditLog::new(),
            listeners: Vec::new(),
            next_listener_id: 0,
            version: 0,
        }
    }

    // --- content ---

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Read `len` bytes starting at `offset`.
    pub fn read(&self, offset: usize, len: usize) -> Result<String, DocumentError> {
        self.content.read(offset, len)
    }

    /// The full text.
    pub fn text(&self) -> String {
        self.content.text()
    }

    /// Insert `text` at `offset`. Empty text is a bounds-checked no-op.
    pub fn insert(&mut self, offset: usize, text: &str) -> Result<(), DocumentError> {
        if text.is_empty() {
            return self.content.insert(offset, text);
        }
        self.content.insert(offset, text)?;
        let edit = Edit::Insert {
            offset,
            text: text.to_string(),
        };
        self.commit(&edit, true);
        Ok(())
    }

    /// Remove `len` bytes at `offset`, returning the removed text.
    /// Zero length is a bounds-checked no-op.
    pub fn remove(&mut self, offset: usize, len: usize) -> Result<String, DocumentError> {
        if len == 0 {
            return self.content.remove(offset, 0);
        }
        let removed = self.content.remove(offset, len)?;
        let edit = Edit::Remove {
            offset,
            text: removed.clone(),
        };
        self.commit(&edit, true);
        Ok(removed)
    }

    /// Monotonic counter, bumped once per applied edit (undo/redo included).
    pub fn version(&self) -> u64 {
        self.version
    }

    // --- lines ---

    pub fn line_count(&self) -> usize {
        self.lines.line_count()
    }

    /// Half-open byte range of line `index`.
    pub fn line_at(&self, index: usize) -> Result<Range<usize>, DocumentError> {
        self.lines.line_at(index).ok_or(DocumentError::BadLine {
            line: index,
            line_count: self.lines.line_count(),
        })
    }

    /// Index of the line containing `offset`; `offset == len` maps to the
    /// last line.
    pub fn line_of(&self, offset: usize) -> Result<usize, DocumentError> {
        self.lines.line_of(offset).ok_or(DocumentError::BadOffset {
            offset,
            len: 0,
            doc_len: self.len(),
        })
    }

    /// Text of line `index`, including its trailing break if present.
    pub fn line_text(&self, index: usize) -> Result<String, DocumentError> {
        let range = self.line_at(index)?;
        self.read(range.start, range.end - range.start)
    }

    // --- positions ---

    /// Anchor a position at `offset`, valid for `offset <= len` (the
    /// insert-at-end spot included). The caller owns the handle; the
    /// document only adjusts it.
    pub fn create_position(&mut self, offset: usize, bias: Bias) -> Result<Position, DocumentError> {
        if offset > self.len() {
            return Err(DocumentError::BadOffset {
                offset,
                len: 0,
                doc_len: self.len(),
            });
        }
        Ok(Position(self.markers.create(offset, bias)))
    }

    /// Release a position. Returns false if it was already released.
    pub fn release_position(&mut self, position: Position) -> bool {
        self.markers.release(position.0)
    }

    /// Current offset of a position, or None once released.
    pub fn position_offset(&self, position: Position) -> Option<usize> {
        self.markers.offset(position.0)
    }

    /// Number of live positions.
    pub fn position_count(&self) -> usize {
        self.markers.len()
    }

    // --- history ---

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Undo the most recent undo unit. Returns false when there is nothing
    /// to undo.
    ///
    /// Positions come back exactly: after each inverse insertion, the
    /// offsets its removal displaced are restored from the log. Inverse
    /// removals capture displacements of their own, stored for the redo.
    pub fn undo(&mut self) -> bool {
        let steps = self.history.undo();
        if steps.is_empty() {
            return false;
        }
        let mut captured: Vec<Option<Vec<(MarkerId, usize)>>> = vec![None; steps.len()];
        for (i, step) in steps.iter().enumerate().rev() {
            let inverse = step.edit.inverse();
            let displaced = self.replay(&inverse);
            match inverse {
                Edit::Remove { .. } => captured[i] = Some(displaced),
                Edit::Insert { .. } => {
                    for &(id, offset) in &step.displaced {
                        self.markers.set_offset(id, offset);
                    }
                }
            }
        }
        self.history.set_undone_displacements(captured);
        true
    }

    /// Re-apply the most recently undone unit. Returns false when there is
    /// nothing to redo.
    ///
    /// Mirrors `undo`: re-applied insertions restore the positions their
    /// undo displaced, re-applied removals capture fresh displacements.
    pub fn redo(&mut self) -> bool {
        let steps = self.history.redo();
        if steps.is_empty() {
            return false;
        }
        let mut captured: Vec<Option<Vec<(MarkerId, usize)>>> = vec![None; steps.len()];
        for (i, step) in steps.iter().enumerate() {
            let displaced = self.replay(&step.edit);
            match &step.edit {
                Edit::Remove { .. } => captured[i] = Some(displaced),
                Edit::Insert { .. } => {
                    for &(id, offset) in &step.displaced {
                        self.markers.set_offset(id, offset);
                    }
                }
            }
        }
        self.history.set_redone_displacements(captured);
        true
    }

    /// Force the next edit to start a new undo unit.
    pub fn reset_merge(&mut self) {
        self.history.reset_merge();
    }

    /// Whether the document has unsaved edits relative to the last
    /// `mark_saved`.
    pub fn is_modified(&self) -> bool {
        !self.history.is_at_saved_index()
    }

    /// Mark the current state as saved.
    pub fn mark_saved(&mut self) {
        self.history.mark_saved();
    }

    // --- listeners ---

    /// Register a change listener, called synchronously after every applied
    /// edit. A panicking listener is reported and skipped; it never rolls
    /// back the edit or starves other listeners.
    pub fn add_listener(&mut self, listener: impl FnMut(&DocumentChange) + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Unregister a listener. Returns false if it was not registered.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    // --- pipeline ---

    /// Finish an edit whose content mutation already succeeded: update the
    /// line index, adjust markers, record history, bump the version, then
    /// notify. `record` is false for undo/redo replays.
    ///
    /// Returns the marker offsets a removal displaced, captured before the
    /// adjustment pass; the history keeps them so the inverse insertion can
    /// put those markers back exactly.
    fn commit(&mut self, edit: &Edit, record: bool) -> Vec<(MarkerId, usize)> {
        let displaced = match edit {
            Edit::Remove { offset, text } => self.markers.displaced_by(*offset, text.len()),
            Edit::Insert { .. } => Vec::new(),
        };
        match edit {
            Edit::Insert { offset, text } => {
                self.lines.on_insert(*offset, text);
                self.markers.adjust_for_edit(*offset, 0, text.len());
            }
            Edit::Remove { offset, text } => {
                self.lines.on_remove(*offset, text.len());
                self.markers.adjust_for_edit(*offset, text.len(), 0);
            }
        }
        if record {
            self.history.record(edit.clone(), displaced.clone());
        }
        self.version += 1;

        debug_assert_eq!(self.lines.total_len(), self.content.len());

        let line_delta = LineDelta {
            start_line: self.lines.line_of(edit.offset()).unwrap_or(0),
            removed: match edit {
                Edit::Remove { .. } => edit.line_break_count(),
                Edit::Insert { .. } => 0,
            },
            added: match edit {
                Edit::Insert { .. } => edit.line_break_count(),
                Edit::Remove { .. } => 0,
            },
        };
        let change = DocumentChange {
            offset: edit.offset(),
            removed_len: edit.removed_len(),
            inserted_len: edit.inserted_len(),
            line_delta,
        };
        tracing::trace!(
            offset = change.offset,
            removed = change.removed_len,
            inserted = change.inserted_len,
            version = self.version,
            "edit applied"
        );
        self.notify(&change);
        displaced
    }

    /// Apply one edit coming back out of the history, returning the marker
    /// displacements the commit observed. Edits in the log are valid for the
    /// state they were recorded against, so a bounds failure here means the
    /// log and content diverged.
    fn replay(&mut self, edit: &Edit) -> Vec<(MarkerId, usize)> {
        let applied = match edit {
            Edit::Insert { offset, text } => self.content.insert(*offset, text),
            Edit::Remove { offset, text } => {
                self.content.remove(*offset, text.len()).map(|removed| {
                    debug_assert_eq!(&removed, text);
                })
            }
        };
        if let Err(err) = applied {
            debug_assert!(false, "history replay failed: {err}");
            tracing::error!(%err, "history replay failed; document state diverged from log");
            return Vec::new();
        }
        self.commit(edit, false)
    }

    fn notify(&mut self, change: &DocumentChange) {
        for (id, listener) in self.listeners.iter_mut() {
            let outcome = catch_unwind(AssertUnwindSafe(|| listener(change)));
            if outcome.is_err() {
                tracing::error!(listener = id.0, "document change listener panicked");
            }
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
