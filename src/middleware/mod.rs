//! Store decorators.
//!
//! [`StateStore`] is the capability interface shared by [`Store`] and every
//! decorator. A decorator holds the inner store, forwards every operation and
//! intercepts only the ones it enhances, so decorators stack:
//!
//! ```ignore
//! let store = Logged::new(Persisted::open(Store::new(json!({})), "state.bin", PersistFormat::Json), "app");
//! store.set(json!({"count": 1}));
//! ```
//!
//! [`Store`]: crate::store::Store

mod devtools;
mod logger;
mod persistence;
mod sync;

pub use devtools::{ActionNameFn, DevTools, DevToolsEvent, DevToolsOptions};
pub use logger::Logged;
pub use persistence::{load_snapshot, save_snapshot, PersistFormat, Persisted};
pub use sync::{ServerSync, SyncErrorHandler, SyncTransport, MIN_SYNC_PERIOD};

use crate::store::Store;
use crate::subscriptions::{Listener, Subscription};
use crate::types::State;
use serde_json::Value;
use std::rc::Rc;

/// The operations every store layer exposes.
pub trait StateStore {
    fn get(&self) -> State;
    fn get_all(&self) -> State;
    fn set(&self, partial: Value);
    fn replace(&self, key: &str, value: Value);
    /// Apply a full state without recording history.
    fn replace_state(&self, state: Value);
    fn subscribe(&self, listener: Listener) -> Subscription;
    fn undo(&self) -> bool;
    fn redo(&self) -> bool;
}

impl StateStore for Store {
    fn get(&self) -> State {
        Store::get(self)
    }

    fn get_all(&self) -> State {
        Store::get_all(self)
    }

    fn set(&self, partial: Value) {
        Store::set(self, partial)
    }

    fn replace(&self, key: &str, value: Value) {
        Store::replace(self, key, value)
    }

    fn replace_state(&self, state: Value) {
        Store::replace_state(self, state)
    }

    fn subscribe(&self, listener: Listener) -> Subscription {
        self.subscribe_rc(listener)
    }

    fn undo(&self) -> bool {
        Store::undo(self)
    }

    fn redo(&self) -> bool {
        Store::redo(self)
    }
}

impl<S: StateStore + ?Sized> StateStore for Rc<S> {
    fn get(&self) -> State {
        (**self).get()
    }

    fn get_all(&self) -> State {
        (**self).get_all()
    }

    fn set(&self, partial: Value) {
        (**self).set(partial)
    }

    fn replace(&self, key: &str, value: Value) {
        (**self).replace(key, value)
    }

    fn replace_state(&self, state: Value) {
        (**self).replace_state(state)
    }

    fn subscribe(&self, listener: Listener) -> Subscription {
        (**self).subscribe(listener)
    }

    fn undo(&self) -> bool {
        (**self).undo()
    }

    fn redo(&self) -> bool {
        (**self).redo()
    }
}
