//! The in-memory store map.
//!
//! This is the only place state physically lives. All access goes through a
//! single mutex; reads hold it only long enough to clone, so callers never
//! see a reference into internal state.

use std::sync::{Mutex, PoisonError};

use super::{default_transformer_inputs, Snapshot, StoreData, StoreId};

/// Locked mapping from store id to store data.
pub struct StateStore {
    data: Mutex<Snapshot>,
}

impl StateStore {
    /// Create the store map with every registered store initialized.
    pub fn new() -> Self {
        let store = Self {
            data: Mutex::new(Snapshot::new()),
        };
        store.initialize();
        store
    }

    /// Populate every registered store: empty mappings everywhere except the
    /// authoritative store, which gets the documented defaults.
    ///
    /// Idempotent; also used as "clear all".
    pub fn initialize(&self) {
        let mut data = self.lock();
        data.clear();
        for id in StoreId::ALL {
            if id.is_authoritative() {
                data.insert(id, default_transformer_inputs());
            } else {
                data.insert(id, StoreData::new());
            }
        }
    }

    /// Get a copy of one store's data.
    pub fn get(&self, id: StoreId) -> StoreData {
        self.lock().get(&id).cloned().unwrap_or_default()
    }

    /// Replace one store's data wholesale, returning the previous value.
    ///
    /// Merge semantics live in the propagation and persistence layers, never
    /// here.
    pub fn replace(&self, id: StoreId, data: StoreData) -> StoreData {
        self.lock().insert(id, data).unwrap_or_default()
    }

    /// Get a copy of the entire state.
    pub fn snapshot(&self) -> Snapshot {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Snapshot> {
        // A poisoned lock only means a listener-free critical section
        // panicked mid-swap; the map itself is still a valid snapshot.
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_initializes_all_stores() {
        let store = StateStore::new();
        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), StoreId::ALL.len());
    }

    #[test]
    fn only_authoritative_store_starts_non_empty() {
        let store = StateStore::new();
        for id in StoreId::ALL {
            let data = store.get(id);
            if id.is_authoritative() {
                assert!(!data.is_empty());
            } else {
                assert!(data.is_empty(), "{id} should start empty");
            }
        }
    }

    #[test]
    fn get_returns_isolated_copy() {
        let store = StateStore::new();
        let mut copy = store.get(StoreId::Losses);
        copy.insert("mutated".into(), json!(true));
        assert!(store.get(StoreId::Losses).is_empty());
    }

    #[test]
    fn replace_swaps_wholesale_and_returns_old() {
        let store = StateStore::new();
        let mut first = StoreData::new();
        first.insert("a".into(), json!(1));
        store.replace(StoreId::Losses, first.clone());

        let mut second = StoreData::new();
        second.insert("b".into(), json!(2));
        let old = store.replace(StoreId::Losses, second);

        assert_eq!(old, first);
        let current = store.get(StoreId::Losses);
        assert!(!current.contains_key("a"));
        assert_eq!(current["b"], json!(2));
    }

    #[test]
    fn initialize_is_idempotent_and_clears() {
        let store = StateStore::new();
        let mut data = StoreData::new();
        data.insert("x".into(), json!(1));
        store.replace(StoreId::Impulse, data);

        store.initialize();

        assert!(store.get(StoreId::Impulse).is_empty());
        assert!(!store.get(StoreId::TransformerInputs).is_empty());
    }
}
