//! Derived selections that only change when the selected value changes.

use crate::store::Store;
use crate::subscriptions::Subscription;
use crate::types::State;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// A cached selection over a store's state.
///
/// The selector subscribes on creation and replaces its value only when the
/// equality function reports a difference.
pub struct Selector<T> {
    current: Rc<RefCell<T>>,
    updates: Rc<Cell<u64>>,
    subscription: Subscription,
}

impl<T: Clone + 'static> Selector<T> {
    /// Select with `PartialEq` as the equality function.
    pub fn new<S>(store: &Store, select: S) -> Self
    where
        S: Fn(&State) -> T + 'static,
        T: PartialEq,
    {
        Self::with_equality(store, select, |a: &T, b: &T| a == b)
    }

    pub fn with_equality<S, E>(store: &Store, select: S, equals: E) -> Self
    where
        S: Fn(&State) -> T + 'static,
        E: Fn(&T, &T) -> bool + 'static,
    {
        let current = Rc::new(RefCell::new(store.read(&select)));
        let updates = Rc::new(Cell::new(0));

        let subscription = {
            let current = Rc::clone(&current);
            let updates = Rc::clone(&updates);
            store.subscribe(move |state, _| {
                let next = select(state);
                if !equals(&current.borrow(), &next) {
                    *current.borrow_mut() = next;
                    updates.set(updates.get() + 1);
                }
            })
        };

        Self {
            current,
            updates,
            subscription,
        }
    }

    /// Latest selected value.
    pub fn get(&self) -> T {
        self.current.borrow().clone()
    }

    /// How many times the selected value changed.
    pub fn update_count(&self) -> u64 {
        self.updates.get()
    }

    /// Stop following the store.
    pub fn detach(&self) -> bool {
        self.subscription.unsubscribe()
    }
}
