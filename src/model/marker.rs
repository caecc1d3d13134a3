//! Edit-stable positions.
//!
//! A marker is an offset handle that stays anchored to the same logical spot
//! in the text while other edits happen around it. The document adjusts every
//! live marker with an explicit pass inside its edit pipeline; there is no
//! listener machinery involved.

use serde::{Deserialize, Serialize};

/// Tie-break rule for a marker sitting exactly at an insertion point.
///
/// A forward-biased marker travels with text inserted at its offset; a
/// backward-biased one stays put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bias {
    Backward,
    Forward,
}

/// Handle to a live marker. Valid until released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarkerId(usize);

#[derive(Debug, Clone, Copy)]
struct Marker {
    offset: usize,
    bias: Bias,
}

/// Registry of live markers, addressed by [`MarkerId`].
///
/// Slots are recycled: releasing a marker frees its slot for the next
/// creation, so long-lived documents with heavy position churn stay compact.
pub struct MarkerList {
    slots: Vec<Option<Marker>>,
    free: Vec<usize>,
}

impl MarkerList {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Number of live markers.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register a marker at `offset`. Bounds are the caller's concern; the
    /// document validates `offset <= len` before calling in.
    pub fn create(&mut self, offset: usize, bias: Bias) -> MarkerId {
        let marker = Marker { offset, bias };
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(marker);
                MarkerId(slot)
            }
            None => {
                self.slots.push(Some(marker));
                MarkerId(self.slots.len() - 1)
            }
        }
    }

    /// Drop a marker. Returns false if it was already released.
    pub fn release(&mut self, id: MarkerId) -> bool {
        match self.slots.get_mut(id.0) {
            Some(slot @ Some(_)) => {
                *slot = None;
                self.free.push(id.0);
                true
            }
            _ => false,
        }
    }

    /// Current offset of a marker, or None once released.
    pub fn offset(&self, id: MarkerId) -> Option<usize> {
        self.slots.get(id.0).copied().flatten().map(|m| m.offset)
    }

    pub fn bias(&self, id: MarkerId) -> Option<Bias> {
        self.slots.get(id.0).copied().flatten().map(|m| m.bias)
    }

    /// Ids and current offsets of markers that removing `len` bytes at
    /// `offset` will displace: everything in `[offset, offset + len]`
    /// inclusive. Interior markers snap to the removal start, and the
    /// boundary ones depend on bias when the text comes back, so the
    /// inverse insertion cannot reconstruct any of these offsets. The
    /// caller saves them and restores them after the inverse replays.
    pub fn displaced_by(&self, offset: usize, len: usize) -> Vec<(MarkerId, usize)> {
        if len == 0 {
            return Vec::new();
        }
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, stored)| stored.map(|m| (MarkerId(slot), m.offset)))
            .filter(|&(_, o)| o >= offset && o <= offset + len)
            .collect()
    }

    /// Move a live marker to `offset`. Released ids are ignored.
    pub fn set_offset(&mut self, id: MarkerId, offset: usize) {
        if let Some(Some(marker)) = self.slots.get_mut(id.0) {
            marker.offset = offset;
        }
    }

    /// Adjust every live marker for an edit at `offset` that removed
    /// `removed` bytes and inserted `inserted` bytes.
    ///
    /// Rules, for a marker at `o`:
    /// - pure insert: `o > offset` shifts by `inserted`; `o == offset` shifts
    ///   only with forward bias
    /// - `o` at or past the removed region's end: shifts by the net change
    /// - `o` inside the removed region: snaps to `offset`
    /// - `o` at or before `offset`: unchanged
    pub fn adjust_for_edit(&mut self, offset: usize, removed: usize, inserted: usize) {
        for marker in self.slots.iter_mut().flatten() {
            let o = marker.offset;
            if removed == 0 {
                if o > offset || (o == offset && marker.bias == Bias::Forward) {
                    marker.offset = o + inserted;
                }
            } else if o >= offset + removed {
                marker.offset = o - removed + inserted;
            } else if o > offset {
                marker.offset = offset;
            }
        }
    }
}

impl Default for MarkerList {
    fn default() -> Self {
        Self::new()
    }
}
