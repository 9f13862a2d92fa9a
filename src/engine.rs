//! The engine facade.
//!
//! [`Mcp`] is an explicitly constructed instance (no process-wide global):
//! build one from an [`McpConfig`] and pass it by reference to every
//! handler. The public surface follows the status-value protocol: expected
//! failures come back as booleans or signed session codes, never as panics
//! or raised errors, and the underlying message stays available through
//! [`Mcp::last_error`]. Internals use [`crate::error::Result`] throughout.

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use tracing::{debug, error, info, warn};

use crate::normalize;
use crate::persistence::{merge_store, DiskPersistence};
use crate::propagation;
use crate::session::{
    FileSessionBackend, SessionBackend, SessionManager, SessionSummary,
};
use crate::store::{
    notify_all, ChangeHistory, ChangeRecord, Listener, ListenerRegistry, Snapshot, StateStore,
    StoreData, StoreId, SubscriptionHandle,
};

/// Session save failure: no data, backend rejection, or unexpected error.
pub const SESSION_ERR_GENERIC: i64 = -1;
/// Session save failure: the name is already taken.
pub const SESSION_ERR_DUPLICATE: i64 = -2;
/// Session save failure: a store's data refused to serialize.
pub const SESSION_ERR_SERIALIZATION: i64 = -3;

/// Engine configuration: where state lives on disk.
#[derive(Debug, Clone)]
pub struct McpConfig {
    /// Path of the disk persistence document.
    pub state_path: PathBuf,

    /// Directory holding session records.
    pub sessions_dir: PathBuf,

    /// Change-history cap.
    pub history_limit: usize,
}

impl McpConfig {
    /// Configuration rooted at an explicit data directory.
    pub fn at(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            state_path: data_dir.join("mcp_state.json"),
            sessions_dir: data_dir.join("sessions"),
            history_limit: ChangeHistory::DEFAULT_LIMIT,
        }
    }

    /// The default per-user data directory.
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("trafomcp")
    }
}

impl Default for McpConfig {
    fn default() -> Self {
        Self::at(Self::default_data_dir())
    }
}

/// The state-synchronization and persistence engine.
pub struct Mcp {
    state: StateStore,
    history: Mutex<ChangeHistory>,
    listeners: Mutex<ListenerRegistry>,
    disk: DiskPersistence,
    sessions: SessionManager,
    last_error: Mutex<Option<String>>,
}

impl Mcp {
    /// Create an engine with the file-backed session store.
    pub fn new(config: McpConfig) -> Self {
        let backend = FileSessionBackend::new(config.sessions_dir.clone());
        Self::with_backend(config, Box::new(backend))
    }

    /// Create an engine over a custom session backend.
    pub fn with_backend(config: McpConfig, backend: Box<dyn SessionBackend>) -> Self {
        info!("Initializing MCP engine (state at {:?})", config.state_path);
        Self {
            state: StateStore::new(),
            history: Mutex::new(ChangeHistory::new(config.history_limit)),
            listeners: Mutex::new(ListenerRegistry::new()),
            disk: DiskPersistence::new(config.state_path),
            sessions: SessionManager::new(backend),
            last_error: Mutex::new(None),
        }
    }

    // --- Store Access ---

    /// Get a copy of one store's data. Mutating the copy never affects
    /// internal state.
    pub fn get(&self, id: StoreId) -> StoreData {
        self.state.get(id)
    }

    /// Reload state from disk, then get a copy of one store's data.
    pub fn get_reloaded(&self, id: StoreId) -> StoreData {
        debug!("Forcing reload from disk before reading {id}");
        self.load_from_disk();
        self.state.get(id)
    }

    /// Replace one store's data wholesale.
    ///
    /// The data is normalized, the change is recorded in the history,
    /// listeners for the store run synchronously, and when `propagate` is
    /// set the write triggers the propagation pass for its origin.
    pub fn set(&self, id: StoreId, mut data: StoreData, propagate: bool) {
        normalize::sanitize(&mut data);

        let old = self.state.replace(id, data.clone());
        self.lock_history().record(id, &old, &data);
        self.notify(id, &data);

        if propagate {
            let updated = propagation::propagate_on_change(self, id);
            if !updated.is_empty() {
                debug!("Write to {id} propagated to {} stores", updated.len());
            }
        }
    }

    /// Get a copy of the entire state: the snapshot source for persistence
    /// and sessions.
    pub fn get_all(&self) -> Snapshot {
        self.state.snapshot()
    }

    /// Reset every store to its initial value.
    ///
    /// Listeners are notified with the reset values; when `propagate` is set
    /// the authoritative defaults are pushed back out to all module stores.
    pub fn clear_all(&self, propagate: bool) {
        self.state.initialize();
        info!("All stores reset to defaults");

        let snapshot = self.state.snapshot();
        for (id, data) in &snapshot {
            self.notify(*id, data);
        }

        if propagate {
            propagation::propagate_all(self);
        }
    }

    /// Notify the listeners of one store.
    ///
    /// The subscription list is snapshotted under the lock and invoked with
    /// the lock released, so a listener may re-enter the engine.
    fn notify(&self, id: StoreId, data: &StoreData) {
        let subscriptions = self.lock_listeners().snapshot(id);
        notify_all(&subscriptions, id, data);
    }

    // --- History & Listeners ---

    /// The recorded change history, oldest-first. `None` returns everything;
    /// `Some(n)` the last `n` records.
    pub fn get_change_history(&self, limit: Option<usize>) -> Vec<ChangeRecord> {
        self.lock_history().recent(limit)
    }

    /// Register a listener for a store's writes.
    pub fn subscribe(&self, id: StoreId, listener: Listener) -> SubscriptionHandle {
        self.lock_listeners().subscribe(id, listener)
    }

    /// Remove a previously registered listener.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        self.lock_listeners().unsubscribe(handle)
    }

    // --- Propagation ---

    /// Push the authoritative store's data to every module store.
    pub fn propagate_all(&self) -> bool {
        propagation::propagate_all(self)
    }

    /// Startup sweep: reconcile stray isolation values into the
    /// authoritative store and re-sync every module store.
    pub fn sync_isolation_values(&self) -> bool {
        propagation::sync_isolation_values(self)
    }

    // --- Disk Persistence ---

    /// Save the full state to disk, keeping a backup of the previous
    /// document.
    ///
    /// Refuses to persist a blank state over good data: unless `force` is
    /// set, the save is skipped when every store is empty or the
    /// authoritative store's data is empty.
    pub fn save_to_disk(&self, force: bool) -> bool {
        let snapshot = self.get_all();

        if !force {
            if snapshot.values().all(StoreData::is_empty) {
                warn!("Nothing to save; skipping disk write");
                return false;
            }
            let auth = snapshot.get(&StoreId::AUTHORITATIVE);
            if !auth.is_some_and(|data| !data.is_empty()) {
                warn!("Authoritative store is empty; skipping disk write");
                return false;
            }
        }

        match self.disk.save(&snapshot, true) {
            Ok(()) => {
                info!("State saved to {:?}", self.disk.path());
                true
            }
            Err(e) => {
                error!("Failed to save state to disk: {e}");
                self.record_error(e.to_string());
                false
            }
        }
    }

    /// Restore state from the disk document.
    ///
    /// On failure the current in-memory state is kept untouched. Loaded
    /// stores merge with current data according to the merge policy;
    /// unknown store ids in the document are skipped with a warning.
    pub fn load_from_disk(&self) -> bool {
        let document = match self.disk.load() {
            Ok(document) => document,
            Err(e) => {
                warn!("Could not load state from disk, keeping defaults: {e}");
                self.record_error(e.to_string());
                return false;
            }
        };

        for (store_name, mut data) in document {
            let store_id: StoreId = match store_name.parse() {
                Ok(store_id) => store_id,
                Err(_) => {
                    warn!("Disk document references unknown store '{store_name}'; skipping");
                    continue;
                }
            };
            normalize::sanitize(&mut data);
            let current = self.state.get(store_id);
            let merged = merge_store(&current, data);
            self.state.replace(store_id, merged);
            debug!("Store {store_id} restored from disk");
        }

        true
    }

    // --- Sessions ---

    /// Save a named session. Returns the assigned id (> 0) or a failure
    /// code: [`SESSION_ERR_GENERIC`], [`SESSION_ERR_DUPLICATE`] or
    /// [`SESSION_ERR_SERIALIZATION`].
    ///
    /// A supplied snapshot is used as-is when it contains at least one
    /// store; otherwise the engine's own state is saved.
    pub fn save_session(&self, name: &str, notes: &str, snapshot: Option<&Snapshot>) -> i64 {
        self.clear_error();

        let snapshot = match snapshot {
            Some(provided) if !provided.is_empty() => provided.clone(),
            Some(_) => {
                debug!("Supplied snapshot has no known stores; falling back to engine state");
                self.get_all()
            }
            None => self.get_all(),
        };

        match self.sessions.save(name, notes, &snapshot) {
            Ok(id) => id,
            Err(e) => {
                let code = session_error_code(&e);
                warn!("Session save '{name}' failed ({code}): {e}");
                self.record_error(e.to_string());
                code
            }
        }
    }

    /// Load a session by id, overwriting matching stores and notifying
    /// their listeners. All-or-nothing: any undecodable store blob fails
    /// the whole load and leaves state untouched.
    pub fn load_session(&self, id: i64, propagate: bool) -> bool {
        let snapshot = match self.sessions.load(id) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Session load {id} failed: {e}");
                self.record_error(e.to_string());
                return false;
            }
        };

        for (store_id, data) in snapshot {
            self.state.replace(store_id, data.clone());
            self.notify(store_id, &data);
        }
        info!("Session {id} loaded");

        if propagate {
            propagation::propagate_all(self);
        }
        true
    }

    /// Delete a session by id.
    pub fn delete_session(&self, id: i64) -> bool {
        match self.sessions.delete(id) {
            Ok(deleted) => {
                if deleted {
                    info!("Session {id} deleted");
                } else {
                    warn!("Session {id} not found");
                }
                deleted
            }
            Err(e) => {
                error!("Session delete {id} failed: {e}");
                self.record_error(e.to_string());
                false
            }
        }
    }

    /// All saved sessions, most recent first. Empty on backend failure.
    pub fn list_sessions(&self) -> Vec<SessionSummary> {
        match self.sessions.list() {
            Ok(listing) => listing,
            Err(e) => {
                error!("Session listing failed: {e}");
                self.record_error(e.to_string());
                Vec::new()
            }
        }
    }

    // --- Diagnostics ---

    /// The message of the most recent failure, if any.
    pub fn last_error(&self) -> Option<String> {
        self.lock_error().clone()
    }

    fn record_error(&self, message: String) {
        *self.lock_error() = Some(message);
    }

    fn clear_error(&self) {
        *self.lock_error() = None;
    }

    fn lock_history(&self) -> std::sync::MutexGuard<'_, ChangeHistory> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_listeners(&self) -> std::sync::MutexGuard<'_, ListenerRegistry> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_error(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.last_error.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn session_error_code(error: &crate::error::McpError) -> i64 {
    use crate::error::McpError;
    match error {
        McpError::DuplicateName { .. } => SESSION_ERR_DUPLICATE,
        McpError::Serialization { .. } => SESSION_ERR_SERIALIZATION,
        _ => SESSION_ERR_GENERIC,
    }
}

impl std::fmt::Debug for Mcp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mcp")
            .field("state_path", &self.disk.path())
            .finish_non_exhaustive()
    }
}
