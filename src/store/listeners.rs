//! Typed publish/subscribe for store writes.
//!
//! Subscribers register per store id and receive every write synchronously.
//! Registration hands back a [`SubscriptionHandle`], so removal never
//! depends on callable identity. The registry only stores and snapshots
//! callbacks; invocation goes through [`notify_all`] on a snapshot taken
//! outside any lock, so a listener may freely re-enter the engine (for
//! example to write a derived value into another store). One handler's
//! panic is isolated and logged; the remaining handlers still run.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, error};

use super::{StoreData, StoreId};

/// Callback invoked with the store id and the freshly written data.
pub type Listener = Arc<dyn Fn(StoreId, &StoreData) + Send + Sync>;

/// Opaque token identifying one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

/// A handle paired with its cloned callback, as returned by
/// [`ListenerRegistry::snapshot`].
pub type Subscription = (SubscriptionHandle, Listener);

/// Per-store list of subscribers.
#[derive(Default)]
pub struct ListenerRegistry {
    by_store: HashMap<StoreId, Vec<Subscription>>,
    next_handle: u64,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for a store; returns the handle used to remove it.
    pub fn subscribe(&mut self, store_id: StoreId, callback: Listener) -> SubscriptionHandle {
        self.next_handle += 1;
        let handle = SubscriptionHandle(self.next_handle);
        self.by_store
            .entry(store_id)
            .or_default()
            .push((handle, callback));
        debug!("Listener {:?} subscribed to {}", handle, store_id);
        handle
    }

    /// Remove a subscription. Returns false if the handle is unknown.
    pub fn unsubscribe(&mut self, handle: SubscriptionHandle) -> bool {
        for subs in self.by_store.values_mut() {
            if let Some(pos) = subs.iter().position(|(h, _)| *h == handle) {
                subs.remove(pos);
                debug!("Listener {:?} unsubscribed", handle);
                return true;
            }
        }
        false
    }

    /// Clone the subscriptions registered for `store_id`.
    ///
    /// Callbacks are `Arc`s, so the snapshot is cheap. Callers take the
    /// snapshot under their lock, release it, then invoke via
    /// [`notify_all`]; holding a lock across invocation would deadlock any
    /// listener that re-enters the engine.
    pub fn snapshot(&self, store_id: StoreId) -> Vec<Subscription> {
        self.by_store.get(&store_id).cloned().unwrap_or_default()
    }

    /// Number of listeners registered for a store.
    pub fn count(&self, store_id: StoreId) -> usize {
        self.by_store.get(&store_id).map_or(0, Vec::len)
    }
}

/// Invoke every subscription in a snapshot.
///
/// A panicking listener is logged and skipped; it never prevents the
/// remaining listeners from running.
pub fn notify_all(subscriptions: &[Subscription], store_id: StoreId, data: &StoreData) {
    for (handle, callback) in subscriptions {
        let result = catch_unwind(AssertUnwindSafe(|| callback(store_id, data)));
        if result.is_err() {
            error!("Listener {:?} for {} panicked", handle, store_id);
        }
    }
}
