//! The live state map and change detection.
//!
//! `StateContainer` owns the single mutable mapping of a store. Every write
//! goes through it and reports the previous values of the keys it touched.
//! `ChangeDetector` decides which keys of a proposed partial update actually
//! differ from the current state, so no-op updates never reach listeners or
//! history.

mod container;
mod diff;

pub use container::StateContainer;
pub use diff::{compare_states, share_structure, ChangeDetector, ChangeSet};
