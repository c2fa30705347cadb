//! Snapshot-based undo/redo.
//!
//! A [`Snapshot`] is a value copy of the history at one point in time. The
//! [`UndoRedoStack`] keeps past states on the undo stack and undone states on
//! the redo stack, both most-recent-last. Saving a new state always discards
//! the redo stack: redo is only valid along a single unbroken undo chain.

use crate::record::Calculation;

/// Immutable copy of the history contents.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    records: Vec<Calculation>,
}

impl Snapshot {
    pub fn capture<I>(records: I) -> Self
    where
        I: IntoIterator<Item = Calculation>,
    {
        Snapshot {
            records: records.into_iter().collect(),
        }
    }

    pub fn records(&self) -> &[Calculation] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn into_records(self) -> Vec<Calculation> {
        self.records
    }
}

impl From<&[Calculation]> for Snapshot {
    fn from(records: &[Calculation]) -> Self {
        Snapshot::capture(records.iter().copied())
    }
}

/// Two stacks of history snapshots.
#[derive(Debug, Default)]
pub struct UndoRedoStack {
    undo: Vec<Snapshot>,
    redo: Vec<Snapshot>,
}

impl UndoRedoStack {
    pub fn new() -> Self {
        UndoRedoStack::default()
    }

    /// Record the state as it was *before* a mutating action. Clears redo.
    pub fn save_state(&mut self, before: Snapshot) {
        self.undo.push(before);
        self.redo.clear();
    }

    /// Step back: `current` moves to the redo stack and the previous state is
    /// returned. `None` when there is nothing to undo; the stacks are untouched.
    pub fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let previous = self.undo.pop()?;
        self.redo.push(current);
        Some(previous)
    }

    /// Step forward: `current` moves to the undo stack and the next state is
    /// returned. `None` when there is nothing to redo.
    pub fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let next = self.redo.pop()?;
        self.undo.push(current);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }
}
