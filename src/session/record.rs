//! Session records.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named, persisted snapshot of every store.
///
/// Read-only once loaded: loading a session mutates the live stores, never
/// the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Backend-assigned identifier, always positive.
    pub id: i64,

    /// Unique, case-sensitive session name.
    pub name: String,

    /// Free-text notes.
    pub notes: String,

    /// When the session was saved.
    pub timestamp: DateTime<Utc>,

    /// One serialized JSON blob per store, keyed by the store's textual id.
    pub data: BTreeMap<String, String>,
}

/// Listing entry: a record without its data blobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: i64,
    pub name: String,
    pub notes: String,
    pub timestamp: DateTime<Utc>,
}

impl SessionRecord {
    /// The listing view of this record.
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            name: self.name.clone(),
            notes: self.notes.clone(),
            timestamp: self.timestamp,
        }
    }
}
