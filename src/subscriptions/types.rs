//! Listener and subscription handle types.

use crate::types::{Delta, ListenerId, State};
use std::fmt;
use std::rc::{Rc, Weak};

use super::manager::RegistryInner;

/// A state change observer.
pub type Listener = Rc<dyn Fn(&State, &Delta)>;

/// Handle returned by `subscribe`.
///
/// Dropping the handle does not unsubscribe; call [`Subscription::unsubscribe`].
/// The handle only holds a weak reference, so it stays safe to use after the
/// store is gone.
#[derive(Clone)]
pub struct Subscription {
    pub(crate) id: ListenerId,
    pub(crate) registry: Weak<RegistryInner>,
}

impl Subscription {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Remove exactly this registration.
    ///
    /// Returns false if it was already removed or the store was dropped.
    pub fn unsubscribe(&self) -> bool {
        match self.registry.upgrade() {
            Some(inner) => inner.remove(self.id),
            None => false,
        }
    }

    /// True while the registration is still active.
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .map(|inner| inner.contains(self.id))
            .unwrap_or(false)
    }

    pub(crate) fn new(id: ListenerId, registry: &Rc<RegistryInner>) -> Self {
        Self {
            id,
            registry: Rc::downgrade(registry),
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
