//! Listener registry implementation.

use crate::types::{Delta, ListenerId, State};
use lru::LruCache;
use std::cell::{Cell, RefCell};
use std::num::NonZeroUsize;
use std::rc::Rc;

use super::types::{Listener, Subscription};

/// Default number of listeners tracked as hot.
pub const DEFAULT_HOT_LISTENER_CAPACITY: usize = 10;

/// Internal registration state.
struct Registration {
    id: ListenerId,
    listener: Listener,
}

/// Shared registry state. Subscription handles point here weakly.
pub(crate) struct RegistryInner {
    /// Active registrations in subscription order.
    registrations: RefCell<Vec<Registration>>,
    /// Invocation counts of the most recently dispatched listeners.
    hot: RefCell<LruCache<ListenerId, u64>>,
    next_id: Cell<u64>,
}

impl RegistryInner {
    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        let mut registrations = self.registrations.borrow_mut();
        let before = registrations.len();
        registrations.retain(|r| r.id != id);
        let removed = registrations.len() != before;
        drop(registrations);

        if removed {
            self.hot.borrow_mut().pop(&id);
        }
        removed
    }

    pub(crate) fn contains(&self, id: ListenerId) -> bool {
        self.registrations.borrow().iter().any(|r| r.id == id)
    }

    fn record_call(&self, id: ListenerId) {
        let mut hot = self.hot.borrow_mut();
        if let Some(count) = hot.get_mut(&id) {
            *count += 1;
            return;
        }
        hot.put(id, 1);
    }
}

/// Maintains the ordered set of listeners and dispatches notifications.
pub struct ListenerRegistry {
    inner: Rc<RegistryInner>,
}

impl ListenerRegistry {
    /// Create a registry tracking up to `hot_capacity` hot listeners.
    pub fn new(hot_capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(hot_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Rc::new(RegistryInner {
                registrations: RefCell::new(Vec::new()),
                hot: RefCell::new(LruCache::new(capacity)),
                next_id: Cell::new(1),
            }),
        }
    }

    /// Register a listener. Every call creates a new registration.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&State, &Delta) + 'static,
    {
        self.subscribe_rc(Rc::new(listener))
    }

    /// Register an already shared listener.
    pub fn subscribe_rc(&self, listener: Listener) -> Subscription {
        let id = ListenerId(self.inner.next_id.get());
        self.inner.next_id.set(id.0 + 1);

        self.inner
            .registrations
            .borrow_mut()
            .push(Registration { id, listener });

        Subscription::new(id, &self.inner)
    }

    /// Remove a registration. Returns false if it was not active.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.inner.remove(id)
    }

    pub fn listener_count(&self) -> usize {
        self.inner.registrations.borrow().len()
    }

    /// Invoke every listener registered when dispatch starts, in order.
    ///
    /// No registry borrow is held while a listener runs, so listeners may
    /// subscribe, unsubscribe or trigger further notifications.
    pub fn notify(&self, state: &State, delta: &Delta) {
        let snapshot: Vec<(ListenerId, Listener)> = self
            .inner
            .registrations
            .borrow()
            .iter()
            .map(|r| (r.id, Rc::clone(&r.listener)))
            .collect();

        tracing::trace!(listeners = snapshot.len(), changed = delta.len(), "dispatching");

        for (id, listener) in snapshot {
            self.inner.record_call(id);
            listener(state, delta);
        }
    }

    /// Hot listeners and their invocation counts, most called first.
    ///
    /// Counts live in an LRU bounded by the hot capacity. When more listeners
    /// are notified than it holds, the least recently called one is evicted
    /// with its count, so the ranking covers recently active listeners rather
    /// than all-time frequency. Dispatch order is never affected by it.
    pub fn hot_listeners(&self) -> Vec<(ListenerId, u64)> {
        let hot = self.inner.hot.borrow();
        let mut ranked: Vec<(ListenerId, u64)> = hot.iter().map(|(id, n)| (*id, *n)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_HOT_LISTENER_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;

    fn sample() -> (State, Delta) {
        let state = json!({"a": 2, "b": 1}).as_object().cloned().unwrap();
        let mut delta = Delta::new();
        delta.insert("a", Some(json!(1)));
        (state, delta)
    }

    #[test]
    fn test_subscribe_unsubscribe() {
        let registry = ListenerRegistry::default();

        let subscription = registry.subscribe(|_, _| {});
        assert_eq!(registry.listener_count(), 1);
        assert!(subscription.is_active());

        assert!(subscription.unsubscribe());
        assert_eq!(registry.listener_count(), 0);
        assert!(!subscription.unsubscribe());
    }

    #[test]
    fn test_notify_in_subscription_order() {
        let registry = ListenerRegistry::default();
        let calls = Rc::new(RefCell::new(Vec::new()));

        for name in ["first", "second", "third"] {
            let calls = Rc::clone(&calls);
            registry.subscribe(move |_, _| calls.borrow_mut().push(name));
        }

        let (state, delta) = sample();
        registry.notify(&state, &delta);

        assert_eq!(*calls.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_same_listener_twice_is_two_registrations() {
        let registry = ListenerRegistry::default();
        let count = Rc::new(Cell::new(0));

        let listener: Listener = {
            let count = Rc::clone(&count);
            Rc::new(move |_: &State, _: &Delta| count.set(count.get() + 1))
        };
        let first = registry.subscribe_rc(Rc::clone(&listener));
        let _second = registry.subscribe_rc(listener);

        let (state, delta) = sample();
        registry.notify(&state, &delta);
        assert_eq!(count.get(), 2);

        first.unsubscribe();
        registry.notify(&state, &delta);
        assert_eq!(count.get(), 3);
    }

    #[test]
    fn test_unsubscribe_during_dispatch_keeps_in_flight_call() {
        let registry = Rc::new(ListenerRegistry::default());
        let calls = Rc::new(Cell::new(0));
        let victim_slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        {
            let slot = Rc::clone(&victim_slot);
            registry.subscribe(move |_, _| {
                if let Some(victim) = slot.borrow().as_ref() {
                    victim.unsubscribe();
                }
            });
        }
        let victim = {
            let calls = Rc::clone(&calls);
            registry.subscribe(move |_, _| calls.set(calls.get() + 1))
        };
        *victim_slot.borrow_mut() = Some(victim);

        let (state, delta) = sample();
        registry.notify(&state, &delta);
        assert_eq!(calls.get(), 1);

        registry.notify(&state, &delta);
        assert_eq!(calls.get(), 1);
        assert_eq!(registry.listener_count(), 1);
    }

    #[test]
    fn test_subscribe_during_dispatch_waits_for_next_round() {
        let registry = Rc::new(ListenerRegistry::default());
        let late_calls = Rc::new(Cell::new(0));

        {
            let weak = Rc::downgrade(&registry);
            let late_calls = Rc::clone(&late_calls);
            let added = Cell::new(false);
            registry.subscribe(move |_, _| {
                if added.replace(true) {
                    return;
                }
                if let Some(registry) = weak.upgrade() {
                    let late_calls = Rc::clone(&late_calls);
                    registry.subscribe(move |_, _| late_calls.set(late_calls.get() + 1));
                }
            });
        }

        let (state, delta) = sample();
        registry.notify(&state, &delta);
        assert_eq!(late_calls.get(), 0);
        assert_eq!(registry.listener_count(), 2);

        registry.notify(&state, &delta);
        assert_eq!(late_calls.get(), 1);
    }

    #[test]
    fn test_hot_listeners_forget_least_recent() {
        let registry = ListenerRegistry::new(2);
        let _a = registry.subscribe(|_, _| {});
        let b = registry.subscribe(|_, _| {});
        let c = registry.subscribe(|_, _| {});
        let (state, delta) = sample();

        registry.notify(&state, &delta);
        registry.notify(&state, &delta);

        // Each round evicts the oldest entry before it is called again.
        assert_eq!(registry.hot_listeners(), vec![(b.id(), 1), (c.id(), 1)]);
    }

    #[test]
    fn test_hot_listeners_ranked_by_calls() {
        let registry = ListenerRegistry::new(2);
        let a = registry.subscribe(|_, _| {});
        let b = registry.subscribe(|_, _| {});
        let (state, delta) = sample();

        registry.notify(&state, &delta);
        b.unsubscribe();
        registry.notify(&state, &delta);

        assert_eq!(registry.hot_listeners(), vec![(a.id(), 2)]);
    }

    #[test]
    fn test_handle_outlives_registry() {
        let registry = ListenerRegistry::default();
        let subscription = registry.subscribe(|_, _| {});
        drop(registry);

        assert!(!subscription.is_active());
        assert!(!subscription.unsubscribe());
    }
}
