#![forbid(unsafe_code)]

//! Property-changed subscriber list.
//!
//! # Design
//!
//! Subscribers are stored as `Weak` callbacks; the strong `Arc` lives in the
//! [`Subscription`] guard handed back to the caller. Dropping the guard makes
//! the callback unreachable, and the dead entry is pruned on the next
//! notification cycle.
//!
//! Notification snapshots the live callbacks under the lock and invokes them
//! after releasing it, so callbacks may subscribe, unsubscribe, or write
//! properties without deadlocking or invalidating the iteration.
//!
//! # Invariants
//!
//! 1. Callbacks run in registration order.
//! 2. A callback whose guard was dropped before a cycle starts is not called
//!    in that cycle.
//! 3. A callback added during a cycle is first called in the next cycle.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// Callback receiving the changed object and the property name.
pub type ChangedCallback<O> = dyn Fn(&O, &str) + Send + Sync;

type CallbackArc<O> = Arc<ChangedCallback<O>>;
type CallbackWeak<O> = Weak<ChangedCallback<O>>;

/// Ordered list of property-changed subscribers for one owner.
pub(crate) struct ObserverList<O: ?Sized> {
    subscribers: Mutex<Vec<CallbackWeak<O>>>,
}

impl<O: ?Sized + 'static> ObserverList<O> {
    pub(crate) fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn subscribe(
        &self,
        callback: impl Fn(&O, &str) + Send + Sync + 'static,
    ) -> Subscription {
        let strong: CallbackArc<O> = Arc::new(callback);
        self.subscribers.lock().push(Arc::downgrade(&strong));
        Subscription {
            _guard: Box::new(strong),
        }
    }

    /// Registered entries, including dead ones not yet pruned.
    pub(crate) fn len(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Prune dead entries and return the live callbacks in order.
    fn snapshot(&self) -> Vec<CallbackArc<O>> {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|w| w.strong_count() > 0);
        subscribers.iter().filter_map(Weak::upgrade).collect()
    }

    /// Invoke every live callback on the calling thread.
    pub(crate) fn notify(&self, source: &O, property_name: &str) -> usize {
        let callbacks = self.snapshot();
        for cb in &callbacks {
            cb(source, property_name);
        }
        callbacks.len()
    }
}

impl<O: ?Sized> fmt::Debug for ObserverList<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverList")
            .field("subscriber_count", &self.subscribers.lock().len())
            .finish()
    }
}

/// RAII guard for a property-changed callback.
///
/// Dropping the guard unsubscribes: the callback's strong reference goes
/// away and its list entry stops upgrading.
#[must_use = "dropping the Subscription unsubscribes immediately"]
pub struct Subscription {
    _guard: Box<dyn Any + Send + Sync>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
