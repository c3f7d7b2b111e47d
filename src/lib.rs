//! # Reactive KV
//!
//! An observable key-value state container with computed values and
//! undo/redo history.
//!
//! ## Core Concepts
//!
//! - **State**: A flat map of string keys to JSON values, updated partially
//! - **Listeners**: Synchronous observers called once per real change
//! - **Computed values**: Derived keys recomputed only when their inputs change
//! - **History**: A bounded undo/redo timeline of changes
//! - **Middleware**: Decorators adding logging, persistence, devtools and sync
//!
//! ## Example
//!
//! ```ignore
//! use reactive_kv::{StateView, Store};
//! use serde_json::json;
//!
//! let store = Store::new(json!({"count": 0, "items": []}));
//! store.enable_history(None);
//!
//! // Derived value, recomputed when "count" changes
//! store.compute("double", |s| Ok(json!(s.i64("count")? * 2)));
//!
//! let subscription = store.subscribe(|state, delta| {
//!     println!("{:?} changed, now {:?}", delta, state);
//! });
//!
//! store.set(json!({"count": 1}));
//! store.array().push("items", [json!("first")]);
//! store.undo();
//!
//! subscription.unsubscribe();
//! ```

pub mod array;
pub mod computed;
pub mod error;
pub mod history;
pub mod middleware;
pub mod selector;
pub mod state;
pub mod store;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use array::{ArrayOps, FilterResult, MapResult, PushResult, RemovedItem, SortResult};
pub use computed::{ComputeFn, ComputedDefinition, ComputedTracker, StateView, TracingView};
pub use error::{Result, StoreError};
pub use history::{HistoryEntry, HistoryManager, DEFAULT_HISTORY_LIMIT};
pub use middleware::{
    load_snapshot, save_snapshot, ActionNameFn, DevTools, DevToolsEvent, DevToolsOptions, Logged,
    PersistFormat, Persisted, ServerSync, StateStore, SyncErrorHandler, SyncTransport,
    MIN_SYNC_PERIOD,
};
pub use selector::Selector;
pub use state::{compare_states, ChangeDetector, StateContainer};
pub use store::{LiteStore, Store, StoreConfig};
pub use subscriptions::{Listener, ListenerRegistry, Subscription};
pub use types::*;
