//! Selections and the arena that keeps them in step with edits.

use std::fmt;

/// A half-open range `[start, end)` of logical positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Sel {
    pub start: usize,
    pub end: usize,
}

impl Sel {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Empty selection at `p`
    pub fn point(p: usize) -> Self {
        Self { start: p, end: p }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Clamps both ends into `[0, size]` and keeps `start <= end`
    pub fn clamp(&mut self, size: usize) {
        self.end = self.end.min(size);
        self.start = self.start.min(self.end);
    }

    pub fn clamped(mut self, size: usize) -> Self {
        self.clamp(size);
        self
    }
}

impl fmt::Display for Sel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Handle to a selection registered with a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SelId(usize);

/// Live selections owned by callers, shifted by every edit.
///
/// Slots freed by [`SelectionSet::remove`] are reused, so a stale `SelId`
/// may alias a newer selection; owners remove their handles when done.
#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    slots: Vec<Option<Sel>>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, sel: Sel) -> SelId {
        if let Some(i) = self.slots.iter().position(Option::is_none) {
            self.slots[i] = Some(sel);
            return SelId(i);
        }
        self.slots.push(Some(sel));
        SelId(self.slots.len() - 1)
    }

    pub fn remove(&mut self, id: SelId) -> Option<Sel> {
        self.slots.get_mut(id.0).and_then(Option::take)
    }

    pub fn get(&self, id: SelId) -> Option<Sel> {
        self.slots.get(id.0).copied().flatten()
    }

    /// Overwrites a live selection; unknown handles are ignored
    pub fn set(&mut self, id: SelId, sel: Sel) {
        if let Some(Some(slot)) = self.slots.get_mut(id.0) {
            *slot = sel;
        }
    }

    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (SelId, Sel)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.map(|s| (SelId(i), s)))
    }

    /// Snapshot of every live selection, in slot order
    pub fn snapshot(&self) -> Vec<(SelId, Sel)> {
        self.iter().collect()
    }

    /// Clamps every live selection to `size`
    pub fn clamp_all(&mut self, size: usize) {
        for sel in self.slots.iter_mut().flatten() {
            sel.clamp(size);
        }
    }

    /// Adjusts every selection except `skip` for an edit at `at` that
    /// replaced `removed` characters with `inserted` ones.
    ///
    /// Endpoints strictly inside the removed range collapse to `at`;
    /// endpoints at or past its end shift by the size difference. An
    /// endpoint equal to `at` never moves. `size` is the text size after
    /// the edit.
    pub fn shift(
        &mut self,
        at: usize,
        removed: usize,
        inserted: usize,
        skip: Option<SelId>,
        size: usize,
    ) {
        let removed_end = at + removed;
        let delta = inserted as isize - removed as isize;

        let move_point = |p: usize| -> usize {
            if p <= at {
                p
            } else if p < removed_end {
                at
            } else {
                p.saturating_add_signed(delta)
            }
        };

        for (i, slot) in self.slots.iter_mut().enumerate() {
            if skip == Some(SelId(i)) {
                continue;
            }
            let Some(sel) = slot else {
                continue;
            };
            sel.start = move_point(sel.start).min(size);
            sel.end = move_point(sel.end).min(size);
        }
    }
}
