//! Session datastore backends.
//!
//! The engine talks to its backing datastore through [`SessionBackend`];
//! [`FileSessionBackend`] is the shipped implementation, storing one JSON
//! document per session under a directory with monotonically assigned ids.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use tracing::debug;

use super::record::{SessionRecord, SessionSummary};
use crate::error::{McpError, Result};

/// The backing datastore for sessions.
pub trait SessionBackend: Send + Sync {
    /// Persist a new session; returns the assigned id (> 0).
    fn create(&self, name: &str, notes: &str, data: BTreeMap<String, String>) -> Result<i64>;

    /// Fetch a session by id.
    fn get(&self, id: i64) -> Result<Option<SessionRecord>>;

    /// Delete a session by id. Returns false if it did not exist.
    fn delete(&self, id: i64) -> Result<bool>;

    /// Whether a session with this exact name exists (case-sensitive).
    fn exists_by_name(&self, name: &str) -> Result<bool>;

    /// All sessions, most recent first.
    fn list(&self) -> Result<Vec<SessionSummary>>;
}

/// File-per-session JSON backend.
pub struct FileSessionBackend {
    dir: PathBuf,
}

impl FileSessionBackend {
    /// Create a backend storing sessions under `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The storage directory.
    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create session store at {:?}", self.dir))
            .map_err(McpError::Other)
    }

    fn session_path(&self, id: i64) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    fn read_all(&self) -> Result<Vec<SessionRecord>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "json") {
                if let Ok(json) = fs::read_to_string(&path) {
                    if let Ok(record) = serde_json::from_str::<SessionRecord>(&json) {
                        records.push(record);
                    }
                }
            }
        }
        Ok(records)
    }

    fn next_id(&self) -> Result<i64> {
        let max = self.read_all()?.iter().map(|r| r.id).max().unwrap_or(0);
        Ok(max + 1)
    }
}

impl SessionBackend for FileSessionBackend {
    fn create(&self, name: &str, notes: &str, data: BTreeMap<String, String>) -> Result<i64> {
        self.ensure_dir()?;

        let id = self.next_id()?;
        let record = SessionRecord {
            id,
            name: name.to_string(),
            notes: notes.to_string(),
            timestamp: Utc::now(),
            data,
        };

        let path = self.session_path(id);
        let json = serde_json::to_string_pretty(&record).map_err(|e| McpError::Backend {
            message: e.to_string(),
        })?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write session to {path:?}"))
            .map_err(McpError::Other)?;

        debug!("Session '{name}' created with id {id}");
        Ok(id)
    }

    fn get(&self, id: i64) -> Result<Option<SessionRecord>> {
        let path = self.session_path(id);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path)?;
        let record = serde_json::from_str(&json).map_err(|e| McpError::Backend {
            message: format!("corrupt session record {id}: {e}"),
        })?;
        Ok(Some(record))
    }

    fn delete(&self, id: i64) -> Result<bool> {
        let path = self.session_path(id);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)?;
        debug!("Session {id} deleted");
        Ok(true)
    }

    fn exists_by_name(&self, name: &str) -> Result<bool> {
        Ok(self.read_all()?.iter().any(|r| r.name == name))
    }

    fn list(&self) -> Result<Vec<SessionSummary>> {
        let mut summaries: Vec<SessionSummary> =
            self.read_all()?.iter().map(SessionRecord::summary).collect();
        summaries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        Ok(summaries)
    }
}
