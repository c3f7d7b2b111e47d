//! Logging decorator.

use crate::subscriptions::{Listener, Subscription};
use crate::types::State;
use serde_json::Value;

use super::StateStore;

/// Logs the previous and next state around every `set`.
pub struct Logged<S> {
    inner: S,
    label: String,
}

impl<S: StateStore> Logged<S> {
    pub fn new(inner: S, label: impl Into<String>) -> Self {
        Self {
            inner,
            label: label.into(),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: StateStore> StateStore for Logged<S> {
    fn get(&self) -> State {
        self.inner.get()
    }

    fn get_all(&self) -> State {
        self.inner.get_all()
    }

    fn set(&self, partial: Value) {
        let prev = Value::Object(self.inner.get());
        tracing::info!(store = %self.label, update = %partial, "state update");
        self.inner.set(partial);
        let next = Value::Object(self.inner.get());
        tracing::debug!(store = %self.label, prev = %prev, next = %next, "state updated");
    }

    fn replace(&self, key: &str, value: Value) {
        tracing::info!(store = %self.label, key, value = %value, "state replace");
        self.inner.replace(key, value);
    }

    fn replace_state(&self, state: Value) {
        tracing::info!(store = %self.label, "state replaced");
        self.inner.replace_state(state);
    }

    fn subscribe(&self, listener: Listener) -> Subscription {
        self.inner.subscribe(listener)
    }

    fn undo(&self) -> bool {
        let undone = self.inner.undo();
        tracing::info!(store = %self.label, undone, "undo");
        undone
    }

    fn redo(&self) -> bool {
        let redone = self.inner.redo();
        tracing::info!(store = %self.label, redone, "redo");
        redone
    }
}
