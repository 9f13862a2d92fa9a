//! Change history recording.
//!
//! Every write appends a [`ChangeRecord`] with a field-level diff of the
//! store. The log is bounded FIFO: once the cap is exceeded the oldest
//! record is dropped.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::{StoreData, StoreId};

/// One field's transition. Added fields have `old == None`, removed fields
/// have `new == None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub field: String,
    pub old: Option<Value>,
    pub new: Option<Value>,
}

/// A recorded write against one store.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeRecord {
    pub store_id: StoreId,
    pub timestamp: DateTime<Utc>,
    pub changes: Vec<FieldChange>,
}

/// Bounded append-only log of store diffs.
pub struct ChangeHistory {
    records: VecDeque<ChangeRecord>,
    limit: usize,
}

impl ChangeHistory {
    /// Default number of records to keep.
    pub const DEFAULT_LIMIT: usize = 100;

    /// Create a history bounded at `limit` records.
    pub fn new(limit: usize) -> Self {
        Self {
            records: VecDeque::new(),
            limit,
        }
    }

    /// Record a write, computing the field-level diff between the old and
    /// new data. Evicts the oldest record once the cap is exceeded.
    pub fn record(&mut self, store_id: StoreId, old: &StoreData, new: &StoreData) {
        self.records.push_back(ChangeRecord {
            store_id,
            timestamp: Utc::now(),
            changes: diff(old, new),
        });
        while self.records.len() > self.limit {
            self.records.pop_front();
        }
    }

    /// The recorded changes, oldest-first. `None` or `Some(0)` returns
    /// everything; `Some(n)` returns the last `n` records.
    pub fn recent(&self, limit: Option<usize>) -> Vec<ChangeRecord> {
        match limit {
            Some(n) if n > 0 && n < self.records.len() => {
                self.records.iter().skip(self.records.len() - n).cloned().collect()
            }
            _ => self.records.iter().cloned().collect(),
        }
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Field-level diff: added fields get `(None, new)`, removed fields get
/// `(old, None)`, changed fields get `(old, new)`; unchanged fields are
/// omitted.
fn diff(old: &StoreData, new: &StoreData) -> Vec<FieldChange> {
    let mut changes = Vec::new();

    for (field, new_value) in new {
        match old.get(field) {
            None => changes.push(FieldChange {
                field: field.clone(),
                old: None,
                new: Some(new_value.clone()),
            }),
            Some(old_value) if old_value != new_value => changes.push(FieldChange {
                field: field.clone(),
                old: Some(old_value.clone()),
                new: Some(new_value.clone()),
            }),
            Some(_) => {}
        }
    }

    for (field, old_value) in old {
        if !new.contains_key(field) {
            changes.push(FieldChange {
                field: field.clone(),
                old: Some(old_value.clone()),
                new: None,
            });
        }
    }

    changes
}
