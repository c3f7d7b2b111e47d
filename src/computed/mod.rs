//! Computed values derived from state keys.
//!
//! A computed entry caches the result of a pure function over the state.
//! When defined, the function runs once for its initial value and once more
//! against a [`TracingView`] that records every key it reads. The recorded
//! keys form a reverse index `state key -> computed keys`, and later changes
//! recompute only the entries reachable from the changed keys.
//!
//! Tracing is a one-shot static approximation: a function that reads
//! different keys on different branches keeps the dependencies of the branch
//! taken at definition time. Entries whose trace recorded nothing are treated
//! as having unknown dependencies and are recomputed on every change.
//!
//! A failing function never aborts the triggering update. The failure is
//! logged and the previous cached value is kept.
//!
//! Computed functions see the state only. Other computed values are not
//! visible to them, so one computed value cannot be derived from another;
//! derive both from the underlying state keys instead.

mod tracker;
mod view;

pub use tracker::{ComputeFn, ComputedDefinition, ComputedTracker};
pub use view::{StateView, TracingView};
