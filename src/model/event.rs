//! Invertible edit history.
//!
//! Every applied edit is recorded with enough text to invert it: a removal
//! keeps the removed text, so its inverse is an insertion of the same text at
//! the same offset. Compatible consecutive edits merge into a single
//! [`UndoUnit`], which is what one undo or redo step traverses.
//!
//! The log is a vector of units plus a cursor. Recording while the cursor is
//! not at the end truncates the tail, discarding the redo history.
//!
//! Each logged edit also carries the marker offsets its removal displaced.
//! Inverting a removal restores the text, but a marker that sat in the
//! removed span lost its exact offset, so the log keeps those offsets and
//! hands them back when the edit is traversed.

use serde::{Deserialize, Serialize};

use crate::model::marker::MarkerId;

/// An atomic, invertible edit described by its offset and the full text it
/// inserted or removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Edit {
    Insert { offset: usize, text: String },
    Remove { offset: usize, text: String },
}

impl Edit {
    pub fn offset(&self) -> usize {
        match self {
            Self::Insert { offset, .. } | Self::Remove { offset, .. } => *offset,
        }
    }

    pub fn inserted_len(&self) -> usize {
        match self {
            Self::Insert { text, .. } => text.len(),
            Self::Remove { .. } => 0,
        }
    }

    pub fn removed_len(&self) -> usize {
        match self {
            Self::Insert { .. } => 0,
            Self::Remove { text, .. } => text.len(),
        }
    }

    /// Line breaks carried by this edit's text.
    pub fn line_break_count(&self) -> usize {
        match self {
            Self::Insert { text, .. } | Self::Remove { text, .. } => {
                text.bytes().filter(|&b| b == b'\n').count()
            }
        }
    }

    /// The edit that exactly undoes this one.
    pub fn inverse(&self) -> Self {
        match self {
            Self::Insert { offset, text } => Self::Remove {
                offset: *offset,
                text: text.clone(),
            },
            Self::Remove { offset, text } => Self::Insert {
                offset: *offset,
                text: text.clone(),
            },
        }
    }

    /// Whether this edit is small enough to merge into an undo unit:
    /// a single byte that is not a line break.
    fn is_merge_atom(&self) -> bool {
        match self {
            Self::Insert { text, .. } | Self::Remove { text, .. } => {
                text.len() == 1 && text.as_bytes()[0] != b'\n'
            }
        }
    }
}

/// A recorded edit plus the offsets of markers its removal displaced,
/// captured when the removal applied. Restored after the opposite traversal
/// replays the text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggedEdit {
    pub edit: Edit,
    pub displaced: Vec<(MarkerId, usize)>,
}

/// One undo/redo step: one edit, or several merged ones applied in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoUnit {
    edits: Vec<LoggedEdit>,
}

impl UndoUnit {
    fn new(edit: Edit, displaced: Vec<(MarkerId, usize)>) -> Self {
        Self {
            edits: vec![LoggedEdit { edit, displaced }],
        }
    }

    pub fn edits(&self) -> &[LoggedEdit] {
        &self.edits
    }

    /// Merge eligibility: the incoming edit is a single non-break byte of the
    /// same kind as our last edit, strictly adjacent to it. Covers sequential
    /// typing, repeated forward-delete and repeated backspace; everything
    /// else starts a new unit.
    fn can_absorb(&self, edit: &Edit) -> bool {
        if !edit.is_merge_atom() {
            return false;
        }
        let Some(last) = self.edits.last().map(|logged| &logged.edit) else {
            return false;
        };
        match (last, edit) {
            (
                Edit::Insert {
                    offset: last_offset,
                    text: last_text,
                },
                Edit::Insert { offset, .. },
            ) => *offset == last_offset + last_text.len(),
            (
                Edit::Remove {
                    offset: last_offset,
                    ..
                },
                Edit::Remove { offset, text },
            ) => *offset == *last_offset || offset + text.len() == *last_offset,
            _ => false,
        }
    }

    fn absorb(&mut self, edit: Edit, displaced: Vec<(MarkerId, usize)>) {
        self.edits.push(LoggedEdit { edit, displaced });
    }
}

/// Undo/redo log: committed units left of the cursor, undone units right.
pub struct EditLog {
    entries: Vec<UndoUnit>,
    /// Units in `entries[..current_index]` are committed; the rest are the
    /// redo tail.
    current_index: usize,
    /// Forces the next recorded edit into a fresh unit. Set by
    /// `reset_merge` and by every undo/redo traversal.
    merge_barrier: bool,
    /// Cursor value at the last `mark_saved`, if still reachable.
    saved_at_index: Option<usize>,
}

impl EditLog {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            current_index: 0,
            merge_barrier: false,
            saved_at_index: Some(0),
        }
    }

    /// Record an applied edit and the marker offsets its removal displaced,
    /// merging into the last unit when eligible. Any redo tail is discarded.
    pub fn record(&mut self, edit: Edit, displaced: Vec<(MarkerId, usize)>) {
        if self.current_index < self.entries.len() {
            self.entries.truncate(self.current_index);
            // A saved point inside the discarded tail can never be reached again
            if self
                .saved_at_index
                .is_some_and(|saved| saved > self.entries.len())
            {
                self.saved_at_index = None;
            }
        }

        // Merging at the saved point would fold saved and unsaved edits into
        // one undo step, making the saved state unreachable
        let merged = !self.merge_barrier
            && self.saved_at_index != Some(self.entries.len())
            && self
                .entries
                .last()
                .is_some_and(|last| last.can_absorb(&edit));
        match self.entries.last_mut() {
            Some(last) if merged => last.absorb(edit, displaced),
            _ => self.entries.push(UndoUnit::new(edit, displaced)),
        }
        self.current_index = self.entries.len();
        self.merge_barrier = false;
    }

    pub fn can_undo(&self) -> bool {
        self.current_index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.current_index < self.entries.len()
    }

    /// Step back one unit, returning its logged edits in forward application
    /// order. The caller replays their inverses back to front, restoring each
    /// edit's `displaced` offsets once its inverse insertion is in place, and
    /// reports freshly observed displacements through
    /// [`set_undone_displacements`](Self::set_undone_displacements). Empty
    /// when there is nothing to undo.
    pub fn undo(&mut self) -> Vec<LoggedEdit> {
        if !self.can_undo() {
            return Vec::new();
        }
        self.current_index -= 1;
        self.merge_barrier = true;
        self.entries[self.current_index].edits.clone()
    }

    /// Step forward one unit, returning its logged edits in application
    /// order. Empty when there is nothing to redo.
    pub fn redo(&mut self) -> Vec<LoggedEdit> {
        if !self.can_redo() {
            return Vec::new();
        }
        let edits = self.entries[self.current_index].edits.clone();
        self.current_index += 1;
        self.merge_barrier = true;
        edits
    }

    /// Overwrite the displacement lists of the unit just stepped over by
    /// `undo`. `per_edit` is parallel to the unit's edits; `None` leaves an
    /// edit's stored list untouched.
    pub fn set_undone_displacements(&mut self, per_edit: Vec<Option<Vec<(MarkerId, usize)>>>) {
        let Some(unit) = self.entries.get_mut(self.current_index) else {
            return;
        };
        for (logged, displaced) in unit.edits.iter_mut().zip(per_edit) {
            if let Some(displaced) = displaced {
                logged.displaced = displaced;
            }
        }
    }

    /// Overwrite the displacement lists of the unit just stepped over by
    /// `redo`, so a later undo restores the markers that are live now.
    pub fn set_redone_displacements(&mut self, per_edit: Vec<Option<Vec<(MarkerId, usize)>>>) {
        if self.current_index == 0 {
            return;
        }
        let unit = &mut self.entries[self.current_index - 1];
        for (logged, displaced) in unit.edits.iter_mut().zip(per_edit) {
            if let Some(displaced) = displaced {
                logged.displaced = displaced;
            }
        }
    }

    /// Force the next recorded edit to start a new undo unit.
    pub fn reset_merge(&mut self) {
        self.merge_barrier = true;
    }

    /// Number of units currently in the log.
    pub fn unit_count(&self) -> usize {
        self.entries.len()
    }

    /// Mark the current cursor as the saved state.
    pub fn mark_saved(&mut self) {
        self.saved_at_index = Some(self.current_index);
    }

    /// Whether the cursor sits at the last saved state.
    pub fn is_at_saved_index(&self) -> bool {
        self.saved_at_index == Some(self.current_index)
    }
}

impl Default for EditLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::marker::{Bias, MarkerList};

    fn insert(offset: usize, text: &str) -> Edit {
        Edit::Insert {
            offset,
            text: text.to_string(),
        }
    }

    fn remove(offset: usize, text: &str) -> Edit {
        Edit::Remove {
            offset,
            text: text.to_string(),
        }
    }

    fn rec(log: &mut EditLog, edit: Edit) {
        log.record(edit, Vec::new());
    }

    fn edits_of(steps: &[LoggedEdit]) -> Vec<Edit> {
        steps.iter().map(|s| s.edit.clone()).collect()
    }

    #[test]
    fn test_inverse() {
        let edit = insert(3, "abc");
        assert_eq!(edit.inverse(), remove(3, "abc"));
        assert_eq!(edit.inverse().inverse(), edit);
    }

    #[test]
    fn test_empty_log_is_noop() {
        let mut log = EditLog::new();
        assert!(!log.can_undo());
        assert!(!log.can_redo());
        assert!(log.undo().is_empty());
        assert!(log.redo().is_empty());
    }

    #[test]
    fn test_record_undo_redo() {
        let mut log = EditLog::new();
        rec(&mut log, insert(0, "hello"));
        assert!(log.can_undo());
        assert!(!log.can_redo());

        let undone = log.undo();
        assert_eq!(edits_of(&undone), vec![insert(0, "hello")]);
        assert!(!log.can_undo());
        assert!(log.can_redo());

        let redone = log.redo();
        assert_eq!(edits_of(&redone), vec![insert(0, "hello")]);
        assert!(log.can_undo());
        assert!(!log.can_redo());
    }

    #[test]
    fn test_record_discards_redo_tail() {
        let mut log = EditLog::new();
        rec(&mut log, insert(0, "abc"));
        log.undo();
        rec(&mut log, insert(0, "xyz"));
        assert!(!log.can_redo());
        assert_eq!(log.unit_count(), 1);
    }

    #[test]
    fn test_adjacent_single_char_inserts_merge() {
        let mut log = EditLog::new();
        rec(&mut log, insert(0, "x"));
        rec(&mut log, insert(1, "y"));
        assert_eq!(log.unit_count(), 1);

        let undone = log.undo();
        assert_eq!(edits_of(&undone), vec![insert(0, "x"), insert(1, "y")]);
    }

    #[test]
    fn test_reset_merge_splits_units() {
        let mut log = EditLog::new();
        rec(&mut log, insert(0, "x"));
        log.reset_merge();
        rec(&mut log, insert(1, "y"));
        assert_eq!(log.unit_count(), 2);
    }

    #[test]
    fn test_forward_delete_merges() {
        let mut log = EditLog::new();
        rec(&mut log, remove(3, "a"));
        rec(&mut log, remove(3, "b"));
        assert_eq!(log.unit_count(), 1);
    }

    #[test]
    fn test_backspace_merges() {
        let mut log = EditLog::new();
        rec(&mut log, remove(3, "c"));
        rec(&mut log, remove(2, "b"));
        rec(&mut log, remove(1, "a"));
        assert_eq!(log.unit_count(), 1);

        let undone = log.undo();
        assert_eq!(
            edits_of(&undone),
            vec![remove(3, "c"), remove(2, "b"), remove(1, "a")]
        );
    }

    #[test]
    fn test_non_adjacent_does_not_merge() {
        let mut log = EditLog::new();
        rec(&mut log, insert(0, "x"));
        rec(&mut log, insert(5, "y"));
        assert_eq!(log.unit_count(), 2);
    }

    #[test]
    fn test_multi_char_does_not_merge() {
        let mut log = EditLog::new();
        rec(&mut log, insert(0, "x"));
        rec(&mut log, insert(1, "yz"));
        assert_eq!(log.unit_count(), 2);
    }

    #[test]
    fn test_line_break_does_not_merge() {
        let mut log = EditLog::new();
        rec(&mut log, insert(0, "x"));
        rec(&mut log, insert(1, "\n"));
        assert_eq!(log.unit_count(), 2);
    }

    #[test]
    fn test_mixed_kinds_do_not_merge() {
        let mut log = EditLog::new();
        rec(&mut log, insert(0, "x"));
        rec(&mut log, remove(0, "x"));
        assert_eq!(log.unit_count(), 2);
    }

    #[test]
    fn test_undo_breaks_merge_chain() {
        let mut log = EditLog::new();
        rec(&mut log, insert(0, "x"));
        log.undo();
        log.redo();
        rec(&mut log, insert(1, "y"));
        assert_eq!(log.unit_count(), 2);
    }

    #[test]
    fn test_saved_index_tracking() {
        let mut log = EditLog::new();
        assert!(log.is_at_saved_index());

        rec(&mut log, insert(0, "a"));
        assert!(!log.is_at_saved_index());

        log.mark_saved();
        assert!(log.is_at_saved_index());

        log.undo();
        assert!(!log.is_at_saved_index());
        log.redo();
        assert!(log.is_at_saved_index());
    }

    #[test]
    fn test_saved_index_lost_after_truncation() {
        let mut log = EditLog::new();
        rec(&mut log, insert(0, "a"));
        rec(&mut log, insert(5, "b"));
        log.mark_saved();
        log.undo();
        rec(&mut log, insert(0, "c"));
        assert!(!log.is_at_saved_index());
        log.undo();
        assert!(!log.is_at_saved_index());
    }

    #[test]
    fn test_no_merge_across_saved_point() {
        let mut log = EditLog::new();
        rec(&mut log, insert(0, "x"));
        log.mark_saved();
        rec(&mut log, insert(1, "y"));
        assert_eq!(log.unit_count(), 2);
        log.undo();
        assert!(log.is_at_saved_index());
    }

    #[test]
    fn test_displacements_stored_and_returned() {
        let mut markers = MarkerList::new();
        let id = markers.create(3, Bias::Backward);

        let mut log = EditLog::new();
        log.record(remove(1, "bcd"), vec![(id, 3)]);

        let steps = log.undo();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].displaced, vec![(id, 3)]);
    }

    #[test]
    fn test_displacements_follow_each_merged_edit() {
        let mut markers = MarkerList::new();
        let id = markers.create(3, Bias::Backward);

        let mut log = EditLog::new();
        log.record(remove(2, "c"), vec![(id, 3)]);
        log.record(remove(1, "b"), vec![(id, 2)]);
        assert_eq!(log.unit_count(), 1);

        let steps = log.undo();
        assert_eq!(steps[0].displaced, vec![(id, 3)]);
        assert_eq!(steps[1].displaced, vec![(id, 2)]);
    }

    #[test]
    fn test_undone_displacements_skip_none_entries() {
        let mut markers = MarkerList::new();
        let id = markers.create(3, Bias::Backward);

        let mut log = EditLog::new();
        log.record(remove(1, "bcd"), vec![(id, 3)]);
        log.undo();
        log.set_undone_displacements(vec![None]);
        log.redo();

        let steps = log.undo();
        assert_eq!(steps[0].displaced, vec![(id, 3)]);
    }

    #[test]
    fn test_redone_displacements_replace_stored_ones() {
        let mut markers = MarkerList::new();
        let a = markers.create(3, Bias::Backward);
        let b = markers.create(2, Bias::Forward);

        let mut log = EditLog::new();
        log.record(remove(1, "bcd"), vec![(a, 3)]);
        log.undo();
        log.redo();
        log.set_redone_displacements(vec![Some(vec![(b, 2)])]);

        let steps = log.undo();
        assert_eq!(steps[0].displaced, vec![(b, 2)]);
    }

    #[test]
    fn test_edit_serde_round_trip() {
        let edit = insert(7, "ab\ncd");
        let json = serde_json::to_string(&edit).unwrap();
        let back: Edit = serde_json::from_str(&json).unwrap();
        assert_eq!(edit, back);

        let mut markers = MarkerList::new();
        let id = markers.create(4, Bias::Forward);
        let unit = UndoUnit {
            edits: vec![
                LoggedEdit {
                    edit,
                    displaced: Vec::new(),
                },
                LoggedEdit {
                    edit: remove(2, "zz"),
                    displaced: vec![(id, 4)],
                },
            ],
        };
        let json = serde_json::to_string(&unit).unwrap();
        let back: UndoUnit = serde_json::from_str(&json).unwrap();
        assert_eq!(unit, back);
    }
}
