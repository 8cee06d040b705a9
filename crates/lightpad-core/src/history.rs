//! Bounded snapshot history with a cursor for undo/redo.

use std::collections::VecDeque;

/// Default number of snapshots to keep.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// An ordered list of snapshots plus a cursor pointing at the current one.
///
/// Pushing truncates any redo entries past the cursor. When the stack grows
/// past its capacity the oldest snapshot is evicted and the cursor stays on
/// the newest entry.
#[derive(Debug, Clone)]
pub struct History<T> {
    entries: VecDeque<T>,
    /// Index of the current snapshot, `None` while empty.
    cursor: Option<usize>,
    capacity: usize,
}

impl<T: Clone + PartialEq> Default for History<T> {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_LIMIT)
    }
}

impl<T: Clone + PartialEq> History<T> {
    /// Create an empty history holding at most `capacity` snapshots (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: None,
            capacity: capacity.max(1),
        }
    }

    /// Push a snapshot at the cursor.
    /// Returns false if it equals the current snapshot and nothing was recorded.
    pub fn push(&mut self, snapshot: T) -> bool {
        if self.current() == Some(&snapshot) {
            return false;
        }

        if let Some(cursor) = self.cursor {
            self.entries.truncate(cursor + 1);
        }
        self.entries.push_back(snapshot);

        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        self.cursor = Some(self.entries.len() - 1);
        true
    }

    /// Step back one snapshot. Returns the snapshot now current.
    pub fn undo(&mut self) -> Option<&T> {
        match self.cursor {
            Some(cursor) if cursor > 0 => {
                self.cursor = Some(cursor - 1);
                self.entries.get(cursor - 1)
            }
            _ => None,
        }
    }

    /// Step forward one snapshot. Returns the snapshot now current.
    pub fn redo(&mut self) -> Option<&T> {
        match self.cursor {
            Some(cursor) if cursor + 1 < self.entries.len() => {
                self.cursor = Some(cursor + 1);
                self.entries.get(cursor + 1)
            }
            _ => None,
        }
    }

    /// The snapshot at the cursor.
    pub fn current(&self) -> Option<&T> {
        self.cursor.and_then(|cursor| self.entries.get(cursor))
    }

    pub fn can_undo(&self) -> bool {
        matches!(self.cursor, Some(cursor) if cursor > 0)
    }

    pub fn can_redo(&self) -> bool {
        matches!(self.cursor, Some(cursor) if cursor + 1 < self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every snapshot.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }
}
