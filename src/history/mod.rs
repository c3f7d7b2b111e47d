//! Bounded linear undo/redo history.
//!
//! History starts disabled. Enabling it seeds the timeline with a snapshot
//! of the current state and puts the cursor on it. Every observable change
//! then appends one entry holding the before/after values of the changed
//! keys. Recording while the cursor is behind the tail prunes the redo
//! branch, and exceeding the capacity evicts the oldest entry.

mod manager;

pub use manager::{HistoryEntry, HistoryManager, DEFAULT_HISTORY_LIMIT};
