//! Server synchronization decorator.
//!
//! Pulls remote state into the store and pushes local state out through a
//! [`SyncTransport`]. Pull and push share one in-flight flag, so a call made
//! while another sync is running returns immediately without syncing.
//!
//! Auto sync runs on the current thread's `tokio::task::LocalSet`:
//!
//! ```ignore
//! let local = LocalSet::new();
//! local.run_until(async {
//!     let sync = Rc::new(ServerSync::new(Store::default(), transport));
//!     ServerSync::start_auto_sync(&sync, Duration::from_secs(5));
//!     // ...
//!     sync.stop_sync();
//! }).await;
//! ```

use crate::error::{Result, StoreError};
use crate::subscriptions::{Listener, Subscription};
use crate::types::State;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::StateStore;

/// Remote endpoint for state synchronization.
#[allow(async_fn_in_trait)]
pub trait SyncTransport {
    /// Fetch the remote state. `None` means there is nothing to apply.
    async fn fetch(&self) -> Result<Option<Value>>;

    /// Send the full local state.
    async fn push(&self, state: &State) -> Result<()>;
}

/// Receives every transport error.
pub type SyncErrorHandler = Box<dyn Fn(&StoreError)>;

/// Shortest auto-sync period.
pub const MIN_SYNC_PERIOD: Duration = Duration::from_millis(1);

/// Clears the in-flight flag when dropped.
struct SyncGuard<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> SyncGuard<'a> {
    fn try_begin(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.replace(true) {
            return None;
        }
        Some(Self { flag })
    }
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

pub struct ServerSync<S, T> {
    inner: S,
    transport: T,
    syncing: Cell<bool>,
    /// A local `set` has not been pushed yet.
    pending_push: Cell<bool>,
    on_error: SyncErrorHandler,
    timer: RefCell<Option<JoinHandle<()>>>,
}

impl<S, T> ServerSync<S, T> {
    /// Stop auto sync. Safe to call repeatedly.
    pub fn stop_sync(&self) {
        if let Some(handle) = self.timer.borrow_mut().take() {
            handle.abort();
            tracing::debug!("auto sync stopped");
        }
    }

    pub fn is_auto_syncing(&self) -> bool {
        self.timer.borrow().is_some()
    }

    /// True while a pull or push is in flight.
    pub fn is_syncing(&self) -> bool {
        self.syncing.get()
    }

    pub fn has_pending_push(&self) -> bool {
        self.pending_push.get()
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<S: StateStore, T: SyncTransport> ServerSync<S, T> {
    pub fn new(inner: S, transport: T) -> Self {
        Self {
            inner,
            transport,
            syncing: Cell::new(false),
            pending_push: Cell::new(false),
            on_error: Box::new(|e: &StoreError| {
                tracing::error!(error = %e, "server sync failed");
            }),
            timer: RefCell::new(None),
        }
    }

    /// Replace the default handler, which logs the error.
    pub fn with_error_handler(mut self, handler: impl Fn(&StoreError) + 'static) -> Self {
        self.on_error = Box::new(handler);
        self
    }

    /// Fetch the remote state and apply it with `set`.
    ///
    /// Returns false without fetching if a sync is already in flight.
    pub async fn pull(&self) -> bool {
        let Some(_guard) = SyncGuard::try_begin(&self.syncing) else {
            tracing::trace!("pull skipped: sync in flight");
            return false;
        };

        match self.transport.fetch().await {
            Ok(Some(remote)) => self.inner.set(remote),
            Ok(None) => {}
            Err(e) => (self.on_error)(&e),
        }
        true
    }

    /// Send the current state.
    ///
    /// Returns false without sending if a sync is already in flight.
    pub async fn push(&self) -> bool {
        let Some(_guard) = SyncGuard::try_begin(&self.syncing) else {
            tracing::trace!("push skipped: sync in flight");
            return false;
        };

        // Cleared before the snapshot so a `set` made while the push is in
        // flight stays pending.
        self.pending_push.set(false);
        let state = self.inner.get();
        if let Err(e) = self.transport.push(&state).await {
            self.pending_push.set(true);
            (self.on_error)(&e);
        }
        true
    }

    /// Apply a partial update, then push the result.
    pub async fn set_and_push(&self, partial: Value) -> bool {
        self.set(partial);
        self.push().await
    }
}

impl<S, T> ServerSync<S, T>
where
    S: StateStore + 'static,
    T: SyncTransport + 'static,
{
    /// Sync every `period` on the current `LocalSet`: push a pending local
    /// change first, then pull. The first sync runs one period from now.
    ///
    /// Restarts the timer if auto sync is already running. The task holds a
    /// weak reference and ends once the decorator is dropped.
    ///
    /// A zero `period` is raised to [`MIN_SYNC_PERIOD`].
    ///
    /// # Panics
    ///
    /// Panics if called outside a `LocalSet`.
    pub fn start_auto_sync(this: &Rc<Self>, period: Duration) {
        this.stop_sync();
        let period = period.max(MIN_SYNC_PERIOD);

        let weak = Rc::downgrade(this);
        let handle = tokio::task::spawn_local(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(sync) = weak.upgrade() else {
                    break;
                };
                if sync.has_pending_push() {
                    sync.push().await;
                }
                sync.pull().await;
            }
        });

        *this.timer.borrow_mut() = Some(handle);
        tracing::debug!(period_ms = period.as_millis() as u64, "auto sync started");
    }
}

impl<S, T> Drop for ServerSync<S, T> {
    fn drop(&mut self) {
        self.stop_sync();
    }
}

impl<S: StateStore, T: SyncTransport> StateStore for ServerSync<S, T> {
    fn get(&self) -> State {
        self.inner.get()
    }

    fn get_all(&self) -> State {
        self.inner.get_all()
    }

    /// Sets locally and marks the change for the next push.
    fn set(&self, partial: Value) {
        self.inner.set(partial);
        self.pending_push.set(true);
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
