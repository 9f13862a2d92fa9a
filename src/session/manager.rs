//! Session save/load/delete against the backing datastore.
//!
//! `save` follows a strict sequence: duplicate-name check first (no side
//! effects on rejection), then snapshot selection, then per-store
//! serialization, then the backend write. `load` is all-or-nothing: one
//! undecodable blob aborts the whole load, unlike the disk document's
//! per-store tolerance.

use std::collections::BTreeMap;
use std::str::FromStr;

use tracing::{debug, info, warn};

use super::backend::SessionBackend;
use super::record::SessionSummary;
use crate::error::{McpError, Result};
use crate::normalize;
use crate::store::{Snapshot, StoreData, StoreId};

/// CRUD for named full-state snapshots.
pub struct SessionManager {
    backend: Box<dyn SessionBackend>,
}

impl SessionManager {
    /// Create a manager over the given backend.
    pub fn new(backend: Box<dyn SessionBackend>) -> Self {
        Self { backend }
    }

    /// Save a snapshot under a unique name; returns the assigned id.
    ///
    /// Fails with [`McpError::DuplicateName`] before any side effects if the
    /// name is taken, and with [`McpError::Serialization`] if any store's
    /// data refuses to serialize.
    pub fn save(&self, name: &str, notes: &str, snapshot: &Snapshot) -> Result<i64> {
        if self.backend.exists_by_name(name)? {
            warn!("Session name '{name}' already exists");
            return Err(McpError::DuplicateName {
                name: name.to_string(),
            });
        }

        if snapshot.values().all(StoreData::is_empty) {
            return Err(McpError::Backend {
                message: "no data available to save".into(),
            });
        }

        let mut blobs = BTreeMap::new();
        for (id, data) in snapshot {
            let mut data = data.clone();
            normalize::sanitize(&mut data);
            let blob = normalize::to_blob(id.as_str(), &data)?;
            blobs.insert(id.as_str().to_string(), blob);
        }

        let id = self.backend.create(name, notes, blobs)?;
        if id <= 0 {
            return Err(McpError::Backend {
                message: format!("backend returned non-positive session id {id}"),
            });
        }
        info!("Session '{name}' saved with id {id}");
        Ok(id)
    }

    /// Fetch and decode a session into a snapshot.
    ///
    /// Unknown store ids in the record are skipped with a warning; a blob
    /// that fails to decode aborts the whole load.
    pub fn load(&self, id: i64) -> Result<Snapshot> {
        let record = self.backend.get(id)?.ok_or_else(|| McpError::Backend {
            message: format!("session {id} not found"),
        })?;

        if record.data.is_empty() {
            return Err(McpError::Backend {
                message: format!("session {id} contains no data"),
            });
        }

        let mut snapshot = Snapshot::new();
        for (store_name, blob) in &record.data {
            let store_id = match StoreId::from_str(store_name) {
                Ok(store_id) => store_id,
                Err(_) => {
                    warn!("Session {id} references unknown store '{store_name}'; skipping");
                    continue;
                }
            };
            let data: StoreData =
                serde_json::from_str(blob).map_err(|e| McpError::Serialization {
                    store: store_name.clone(),
                    message: e.to_string(),
                })?;
            snapshot.insert(store_id, data);
        }

        debug!("Session {id} ('{}') decoded: {} stores", record.name, snapshot.len());
        Ok(snapshot)
    }

    /// Delete a session by id.
    pub fn delete(&self, id: i64) -> Result<bool> {
        self.backend.delete(id)
    }

    /// All sessions, most recent first.
    pub fn list(&self) -> Result<Vec<SessionSummary>> {
        self.backend.list()
    }
}
