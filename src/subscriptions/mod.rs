//! Listener registry for state change notifications.
//!
//! Listeners are called synchronously, in subscription order, once per
//! observable change. Each receives the new state and the [`Delta`] of
//! previous values.
//!
//! Dispatch iterates a snapshot of the registrations taken when it starts:
//! - listeners removed mid-dispatch still run for the in-flight change
//! - listeners added mid-dispatch only see later changes
//!
//! Subscribing the same callback twice creates two registrations, each with
//! its own [`Subscription`] handle.
//!
//! # Example
//!
//! ```ignore
//! let registry = ListenerRegistry::new(10);
//! let subscription = registry.subscribe(|state, delta| {
//!     println!("changed {:?} -> {:?}", delta, state);
//! });
//! registry.notify(&state, &delta);
//! subscription.unsubscribe();
//! ```
//!
//! [`Delta`]: crate::types::Delta

mod manager;
mod types;

pub use manager::{ListenerRegistry, DEFAULT_HOT_LISTENER_CAPACITY};
pub use types::{Listener, Subscription};
