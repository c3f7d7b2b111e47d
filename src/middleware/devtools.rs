//! DevTools decorator.
//!
//! Publishes every `set` as an action on a bounded channel so an inspector
//! can follow the store, and applies states sent back for time travel.

use crate::subscriptions::{Listener, Subscription};
use crate::types::State;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::Cell;

use super::StateStore;

/// Events published to an inspector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DevToolsEvent {
    /// Initial state when the decorator was attached.
    Init { name: String, state: Value },

    /// A state update, with the full state (computed values included) after it.
    Action { name: String, state: Value },

    /// The store was moved to a state sent by the inspector.
    Jump { state: Value },
}

/// Names an action from the update that triggered it.
pub type ActionNameFn = Box<dyn Fn(&Value) -> String>;

/// DevTools configuration.
pub struct DevToolsOptions {
    /// Store name shown by the inspector.
    pub name: String,

    /// Max buffered events. Events beyond it are dropped.
    /// Default: 1000
    pub buffer_size: usize,

    /// Action naming. Default: every action is "Update State".
    pub action_name: Option<ActionNameFn>,
}

impl Default for DevToolsOptions {
    fn default() -> Self {
        Self {
            name: "State Store".to_string(),
            buffer_size: 1000,
            action_name: None,
        }
    }
}

pub struct DevTools<S> {
    inner: S,
    options: DevToolsOptions,
    sender: Sender<DevToolsEvent>,
    receiver: Receiver<DevToolsEvent>,
    dropped: Cell<u64>,
}

impl<S: StateStore> DevTools<S> {
    pub fn new(inner: S, options: DevToolsOptions) -> Self {
        let (sender, receiver) = bounded(options.buffer_size);
        let devtools = Self {
            inner,
            options,
            sender,
            receiver,
            dropped: Cell::new(0),
        };
        devtools.publish(DevToolsEvent::Init {
            name: devtools.options.name.clone(),
            state: Value::Object(devtools.inner.get_all()),
        });
        devtools
    }

    /// A receiver for the event stream. Receivers share one queue.
    pub fn connection(&self) -> Receiver<DevToolsEvent> {
        self.receiver.clone()
    }

    /// Apply a state sent by the inspector without recording history.
    pub fn jump_to_state(&self, state: Value) {
        self.inner.replace_state(state.clone());
        self.publish(DevToolsEvent::Jump { state });
    }

    /// Parse and apply a serialized state.
    pub fn jump_to_serialized(&self, serialized: &str) -> crate::error::Result<()> {
        let state: Value = serde_json::from_str(serialized)
            .map_err(|e| crate::error::StoreError::Deserialization(e.to_string()))?;
        self.jump_to_state(state);
        Ok(())
    }

    /// Events dropped because the buffer was full or nobody listens.
    pub fn dropped_events(&self) -> u64 {
        self.dropped.get()
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn publish(&self, event: DevToolsEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped.set(self.dropped.get() + 1);
                tracing::warn!(store = %self.options.name, "devtools buffer full, event dropped");
            }
        }
    }
}

impl<S: StateStore> StateStore for DevTools<S> {
    fn get(&self) -> State {
        self.inner.get()
    }

    fn get_all(&self) -> State {
        self.inner.get_all()
    }

    fn set(&self, partial: Value) {
        let name = match &self.options.action_name {
            Some(name_fn) => name_fn(&partial),
            None => "Update State".to_string(),
        };
        self.inner.set(partial);
        self.publish(DevToolsEvent::Action {
            name,
            state: Value::Object(self.inner.get_all()),
        });
    }

    fn replace(&self, key: &str, value: Value) {
        self.inner.replace(key, value)
    }

    fn replace_state(&self, state: Value) {
        self.inner.replace_state(state)
    }

    fn subscribe(&self, listener: Listener) -> Subscription {
        self.inner.subscribe(listener)
    }

    fn undo(&self) -> bool {
        self.inner.undo()
    }

    fn redo(&self) -> bool {
        self.inner.redo()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use serde_json::json;

    #[test]
    fn test_init_and_actions_published() {
        let devtools = DevTools::new(
            Store::new(json!({"count": 0})),
            DevToolsOptions {
                action_name: Some(Box::new(|update: &Value| {
                    format!("set {}", update.as_object().map(|m| m.len()).unwrap_or(0))
                })),
                ..Default::default()
            },
        );
        let rx = devtools.connection();

        devtools.set(json!({"count": 1}));

        assert_eq!(
            rx.try_recv().unwrap(),
            DevToolsEvent::Init {
                name: "State Store".into(),
                state: json!({"count": 0})
            }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            DevToolsEvent::Action {
                name: "set 1".into(),
                state: json!({"count": 1})
            }
        );
    }

    #[test]
    fn test_jump_skips_history() {
        let store = Store::new(json!({"count": 0}));
        store.enable_history(None);
        let devtools = DevTools::new(store, DevToolsOptions::default());

        devtools.set(json!({"count": 1}));
        devtools.jump_to_serialized(r#"{"count": 5}"#).unwrap();

        assert_eq!(devtools.get().get("count"), Some(&json!(5)));
        assert_eq!(devtools.inner().history_len(), 2);
        assert!(devtools.jump_to_serialized("{not json").is_err());
    }

    #[test]
    fn test_full_buffer_drops_events() {
        let devtools = DevTools::new(
            Store::new(json!({"n": 0})),
            DevToolsOptions {
                buffer_size: 2,
                ..Default::default()
            },
        );

        for n in 1..=5 {
            devtools.set(json!({ "n": n }));
        }

        assert_eq!(devtools.dropped_events(), 4);
        assert_eq!(devtools.connection().len(), 2);
    }
}
