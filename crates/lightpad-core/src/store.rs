//! Live position map with snapshot-based undo/redo.

use crate::history::History;
use crate::position::{EntityRef, Position, PositionMap};

/// The single writer of the live position map.
///
/// Every mutation goes through [`PositionStore::commit`], which records a
/// snapshot in the history. Methods return `true` when the live map changed
/// so the caller can notify observers.
#[derive(Debug, Clone)]
pub struct PositionStore {
    live: PositionMap,
    history: History<PositionMap>,
}

impl PositionStore {
    /// Create a store whose baseline snapshot is `initial`.
    pub fn new(initial: PositionMap, history_limit: usize) -> Self {
        let mut history = History::with_capacity(history_limit);
        history.push(initial.clone());
        Self {
            live: initial,
            history,
        }
    }

    /// The live position map.
    pub fn positions(&self) -> &PositionMap {
        &self.live
    }

    /// Position of a single entity.
    pub fn get(&self, entity: &EntityRef) -> Option<Position> {
        self.live.get(entity).copied()
    }

    /// Record a snapshot.
    ///
    /// With `Some(map)` the live map is replaced first; with `None` the
    /// current live map is recorded. Returns false when the snapshot equals
    /// the one at the history cursor.
    pub fn commit(&mut self, snapshot: Option<PositionMap>) -> bool {
        if let Some(map) = snapshot {
            self.live = map;
        }
        let recorded = self.history.push(self.live.clone());
        if recorded {
            log::debug!(
                "Committed positions snapshot ({} entries, history {}/{})",
                self.live.len(),
                self.history.len(),
                self.history.capacity()
            );
        }
        recorded
    }

    /// Move one entity and commit. Unknown entities are ignored.
    pub fn set(&mut self, entity: &EntityRef, position: Position) -> bool {
        match self.live.get_mut(entity) {
            Some(current) if *current != position => {
                *current = position;
                self.commit(None)
            }
            _ => false,
        }
    }

    /// Restore the previous snapshot.
    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(snapshot) => {
                self.live = snapshot.clone();
                log::debug!("Undo to history index {:?}", self.history.cursor());
                true
            }
            None => false,
        }
    }

    /// Re-apply the next snapshot.
    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(snapshot) => {
                self.live = snapshot.clone();
                log::debug!("Redo to history index {:?}", self.history.cursor());
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Number of recorded snapshots.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Replace the live map and restart history from it.
    pub fn reset(&mut self, initial: PositionMap) {
        self.history.clear();
        self.history.push(initial.clone());
        self.live = initial;
    }
}
