//! History manager implementation.

use crate::types::{Change, Delta, State};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};

/// Default number of history entries kept.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// One point on the undo/redo timeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum HistoryEntry {
    /// Full state at the moment history was enabled.
    Snapshot(State),

    /// Before/after values of every key changed by one call.
    Changes(BTreeMap<String, Change>),
}

impl HistoryEntry {
    fn from_delta(delta: &Delta, state: &State) -> Self {
        let changes = delta
            .iter()
            .map(|(key, previous)| {
                (
                    key.to_string(),
                    Change {
                        before: previous.cloned(),
                        after: state.get(key).cloned(),
                    },
                )
            })
            .collect();
        HistoryEntry::Changes(changes)
    }

    /// Values that undo this entry.
    pub fn before_values(&self) -> Vec<(&str, Option<&Value>)> {
        match self {
            HistoryEntry::Snapshot(state) => {
                state.iter().map(|(k, v)| (k.as_str(), Some(v))).collect()
            }
            HistoryEntry::Changes(changes) => changes
                .iter()
                .map(|(k, c)| (k.as_str(), c.before.as_ref()))
                .collect(),
        }
    }

    /// Values that reapply this entry.
    pub fn after_values(&self) -> Vec<(&str, Option<&Value>)> {
        match self {
            HistoryEntry::Snapshot(state) => {
                state.iter().map(|(k, v)| (k.as_str(), Some(v))).collect()
            }
            HistoryEntry::Changes(changes) => changes
                .iter()
                .map(|(k, c)| (k.as_str(), c.after.as_ref()))
                .collect(),
        }
    }
}

/// Bounded history with a cursor. Invariant: `cursor < entries.len()`.
#[derive(Debug)]
pub struct HistoryManager {
    entries: VecDeque<HistoryEntry>,
    cursor: usize,
    capacity: usize,
}

impl HistoryManager {
    /// Start a history seeded with `state`. A capacity of 0 is raised to 1.
    pub fn new(capacity: usize, state: &State) -> Self {
        let mut entries = VecDeque::new();
        entries.push_back(HistoryEntry::Snapshot(state.clone()));
        Self {
            entries,
            cursor: 0,
            capacity: capacity.max(1),
        }
    }

    /// Record an observable change. `state` is the post-change state.
    pub fn record(&mut self, delta: &Delta, state: &State) {
        if delta.is_empty() {
            return;
        }

        if self.cursor + 1 < self.entries.len() {
            let pruned = self.entries.len() - self.cursor - 1;
            self.entries.truncate(self.cursor + 1);
            tracing::debug!(pruned, "redo branch discarded");
        }

        self.entries.push_back(HistoryEntry::from_delta(delta, state));
        if self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        self.cursor = self.entries.len() - 1;
    }

    /// Step back. Returns the entry to reverse, or `None` at the start.
    pub fn undo(&mut self) -> Option<&HistoryEntry> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor + 1)
    }

    /// Step forward. Returns the entry to reapply, or `None` at the tail.
    pub fn redo(&mut self) -> Option<&HistoryEntry> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }
}
