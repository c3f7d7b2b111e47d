//! Main Store struct tying all components together.

use crate::array::ArrayOps;
use crate::computed::{ComputedDefinition, ComputedTracker, StateView};
use crate::error::Result;
use crate::history::{HistoryManager, DEFAULT_HISTORY_LIMIT};
use crate::state::{compare_states, ChangeDetector, ChangeSet, StateContainer};
use crate::subscriptions::{Listener, ListenerRegistry, Subscription};
use crate::types::{Delta, ListenerId, State, StoreStats};
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;

/// Store configuration.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// History capacity used by `enable_history(None)`.
    pub history_limit: usize,

    /// Deep-merge object values on `set`, rebuilding only differing branches.
    pub structural_sharing: bool,

    /// Treat a proposal with more than `threshold * key_count` keys as a
    /// full replacement and skip the per-key comparison.
    ///
    /// With this enabled, re-setting identical values is no longer a no-op.
    pub replace_threshold: Option<f64>,

    /// Number of listeners tracked as hot.
    pub hot_listener_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            structural_sharing: false,
            replace_threshold: None,
            hot_listener_capacity: crate::subscriptions::DEFAULT_HOT_LISTENER_CAPACITY,
        }
    }
}

/// An observable key-value state container.
///
/// Provides a unified interface for:
/// - Reading and partially updating the state
/// - Subscribing to changes
/// - Defining computed values
/// - Undo/redo over a bounded history
///
/// A store is single-threaded. All operations take `&self` and run to
/// completion before returning. Listeners run synchronously inside the call
/// that triggered them and may call back into the store; a listener that
/// always writes a new value recurses without bound.
pub struct Store {
    /// Store configuration.
    config: StoreConfig,

    /// Change detection policy.
    detector: ChangeDetector,

    /// The live state.
    state: RefCell<StateContainer>,

    /// Subscribed listeners.
    listeners: ListenerRegistry,

    /// Computed values and their dependency index.
    computed: RefCell<ComputedTracker>,

    /// Undo/redo timeline, `None` until enabled.
    history: RefCell<Option<HistoryManager>>,
}

impl Store {
    /// Create a store with the default configuration.
    ///
    /// A non-object initial value yields an empty state.
    pub fn new(initial: Value) -> Self {
        Self::with_config(initial, StoreConfig::default())
    }

    /// Create a store with a custom configuration.
    pub fn with_config(initial: Value, config: StoreConfig) -> Self {
        let initial = match initial {
            Value::Object(map) => map,
            _ => State::new(),
        };
        Self::from_state(initial, config)
    }

    /// Create a store from an existing state map.
    pub fn from_state(initial: State, config: StoreConfig) -> Self {
        Self {
            detector: ChangeDetector::new(config.structural_sharing, config.replace_threshold),
            state: RefCell::new(StateContainer::new(initial)),
            listeners: ListenerRegistry::new(config.hot_listener_capacity),
            computed: RefCell::new(ComputedTracker::new()),
            history: RefCell::new(None),
            config,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // --- Reads ---

    /// Current state.
    pub fn get(&self) -> State {
        self.state.borrow().read().clone()
    }

    /// Run `f` against the live state without cloning it.
    ///
    /// `f` must not write to the store.
    pub fn read<R>(&self, f: impl FnOnce(&State) -> R) -> R {
        f(self.state.borrow().read())
    }

    /// Current value of one key.
    pub fn get_key(&self, key: &str) -> Option<Value> {
        self.state.borrow().get(key).cloned()
    }

    /// Cached computed values.
    pub fn get_computed(&self) -> State {
        self.computed.borrow().get_all()
    }

    /// State merged with computed values. Computed values win on collision.
    pub fn get_all(&self) -> State {
        let mut all = self.get();
        all.extend(self.computed.borrow().get_all());
        all
    }

    // --- Writes ---

    /// Apply a partial update.
    ///
    /// Non-object input and updates that change nothing are ignored. A real
    /// change recomputes affected computed values, records history and then
    /// notifies listeners, in that order.
    pub fn set(&self, partial: Value) {
        let delta = {
            let mut state = self.state.borrow_mut();
            let Some(changes) = self.detector.diff(state.read(), &partial) else {
                tracing::trace!("set ignored: no changes");
                return;
            };
            state.apply(changes)
        };
        self.commit(delta, true);
    }

    /// Overwrite one key without recording history.
    pub fn replace(&self, key: &str, value: Value) {
        let delta = {
            let mut state = self.state.borrow_mut();
            if state.get(key) == Some(&value) {
                return;
            }
            state.apply(ChangeSet::single(key, value))
        };
        self.commit(delta, false);
    }

    /// Overwrite every key of `full` without recording history.
    ///
    /// Keys absent from `full` are kept. Used for time travel driven from
    /// outside the store.
    pub fn replace_state(&self, full: Value) {
        let delta = {
            let mut state = self.state.borrow_mut();
            let Some(changes) = ChangeDetector::default().diff(state.read(), &full) else {
                return;
            };
            state.apply(changes)
        };
        self.commit(delta, false);
    }

    /// Mutate the state in place, then notify if anything changed.
    ///
    /// Changes are detected afterwards by key count and per-key equality.
    /// `f` receives the live state and must not call back into the store.
    pub fn bulk_update(&self, f: impl FnOnce(&mut State)) {
        let delta = {
            let mut state = self.state.borrow_mut();
            let before = state.read().clone();
            f(state.read_mut());
            compare_states(&before, state.read())
        };
        if delta.is_empty() {
            tracing::trace!("bulk update ignored: no changes");
            return;
        }
        self.commit(delta, true);
    }

    /// Read-modify-write an array-valued key through `set`.
    ///
    /// Returns `None` without touching anything if `key` is missing or not
    /// an array.
    pub fn update_array<R>(&self, key: &str, f: impl FnOnce(&mut Vec<Value>) -> R) -> Option<R> {
        let mut array = match self.state.borrow().get(key) {
            Some(Value::Array(items)) => items.clone(),
            _ => return None,
        };
        let result = f(&mut array);

        let mut partial = State::new();
        partial.insert(key.to_string(), Value::Array(array));
        self.set(Value::Object(partial));

        Some(result)
    }

    /// Array operations on array-valued keys.
    pub fn array(&self) -> ArrayOps<'_> {
        ArrayOps::new(self)
    }

    /// Propagate a committed delta: computed values, history, listeners.
    fn commit(&self, delta: Delta, record_history: bool) {
        let snapshot = {
            let state = self.state.borrow();
            self.computed
                .borrow_mut()
                .on_change(delta.keys(), state.read());

            if record_history {
                if let Some(history) = self.history.borrow_mut().as_mut() {
                    history.record(&delta, state.read());
                }
            }

            (self.listeners.listener_count() > 0).then(|| state.read().clone())
        };

        // No store borrow is held past this point, so listeners may re-enter.
        if let Some(snapshot) = snapshot {
            self.listeners.notify(&snapshot, &delta);
        }
    }

    // --- Subscriptions ---

    /// Subscribe to changes. Each call is an independent registration.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&State, &Delta) + 'static,
    {
        self.listeners.subscribe(listener)
    }

    /// Subscribe an already shared listener.
    pub fn subscribe_rc(&self, listener: Listener) -> Subscription {
        self.listeners.subscribe_rc(listener)
    }

    /// Remove one registration.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.listener_count()
    }

    /// Most frequently notified listeners, most called first.
    pub fn hot_listeners(&self) -> Vec<(ListenerId, u64)> {
        self.listeners.hot_listeners()
    }

    // --- Computed Values ---

    /// Define a computed value.
    ///
    /// `f` runs twice immediately: once for the initial value and once to
    /// trace the keys it reads. It must be deterministic and side-effect free.
    pub fn compute<F>(&self, key: &str, f: F) -> ComputedDefinition
    where
        F: Fn(&dyn StateView) -> Result<Value> + 'static,
    {
        let state = self.state.borrow();
        self.computed
            .borrow_mut()
            .define(key, Rc::new(f), state.read())
    }

    /// Remove a computed value.
    pub fn remove_computed(&self, key: &str) -> bool {
        self.computed.borrow_mut().remove(key)
    }

    /// Cached value of one computed key.
    pub fn get_computed_key(&self, key: &str) -> Option<Value> {
        self.computed.borrow().get(key).cloned()
    }

    /// State keys a computed value was traced to depend on.
    pub fn computed_dependencies(&self, key: &str) -> Option<Vec<String>> {
        self.computed
            .borrow()
            .dependencies(key)
            .map(|deps| deps.iter().cloned().collect())
    }

    // --- History ---

    /// Start recording history. Later calls are ignored.
    ///
    /// `None` uses the configured `history_limit`.
    pub fn enable_history(&self, limit: Option<usize>) {
        let mut history = self.history.borrow_mut();
        if history.is_some() {
            return;
        }
        let capacity = limit.unwrap_or(self.config.history_limit);
        *history = Some(HistoryManager::new(capacity, self.state.borrow().read()));
        tracing::debug!(capacity, "history enabled");
    }

    pub fn is_history_enabled(&self) -> bool {
        self.history.borrow().is_some()
    }

    /// Step back one change. Returns false at the start of history or when
    /// history is disabled.
    pub fn undo(&self) -> bool {
        let delta = {
            let mut history = self.history.borrow_mut();
            let Some(entry) = history.as_mut().and_then(HistoryManager::undo) else {
                return false;
            };
            self.state.borrow_mut().restore(entry.before_values())
        };
        tracing::debug!(restored = delta.len(), "undo");
        self.commit(delta, false);
        true
    }

    /// Step forward one change. Returns false at the tail of history or when
    /// history is disabled.
    pub fn redo(&self) -> bool {
        let delta = {
            let mut history = self.history.borrow_mut();
            let Some(entry) = history.as_mut().and_then(HistoryManager::redo) else {
                return false;
            };
            self.state.borrow_mut().restore(entry.after_values())
        };
        tracing::debug!(reapplied = delta.len(), "redo");
        self.commit(delta, false);
        true
    }

    pub fn can_undo(&self) -> bool {
        self.history
            .borrow()
            .as_ref()
            .map(HistoryManager::can_undo)
            .unwrap_or(false)
    }

    pub fn can_redo(&self) -> bool {
        self.history
            .borrow()
            .as_ref()
            .map(HistoryManager::can_redo)
            .unwrap_or(false)
    }

    /// Number of history entries, 0 while disabled.
    pub fn history_len(&self) -> usize {
        self.history.borrow().as_ref().map(HistoryManager::len).unwrap_or(0)
    }

    /// History cursor, `None` while disabled.
    pub fn history_cursor(&self) -> Option<usize> {
        self.history.borrow().as_ref().map(HistoryManager::cursor)
    }

    // --- Misc ---

    /// A view exposing only the essential operations.
    pub fn lite(&self) -> LiteStore<'_> {
        LiteStore { store: self }
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            key_count: self.state.borrow().len(),
            computed_count: self.computed.borrow().len(),
            listener_count: self.listeners.listener_count(),
            history_len: self.history_len(),
        }
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::from_state(State::new(), StoreConfig::default())
    }
}

/// The essential store operations without history or computed values.
pub struct LiteStore<'a> {
    store: &'a Store,
}

impl LiteStore<'_> {
    pub fn get(&self) -> State {
        self.store.get()
    }

    pub fn set(&self, partial: Value) {
        self.store.set(partial)
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&State, &Delta) + 'static,
    {
        self.store.subscribe(listener)
    }

    pub fn bulk_update(&self, f: impl FnOnce(&mut State)) {
        self.store.bulk_update(f)
    }

    pub fn update_array<R>(&self, key: &str, f: impl FnOnce(&mut Vec<Value>) -> R) -> Option<R> {
        self.store.update_array(key, f)
    }

    pub fn replace(&self, key: &str, value: Value) {
        self.store.replace(key, value)
    }
}
