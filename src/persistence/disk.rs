//! The on-disk state document.
//!
//! One JSON document per engine instance, mapping store id to store data.
//! Saves are atomic (write-to-temp-then-rename) and keep one backup of the
//! previous document alongside.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{McpError, Result};
use crate::store::{Snapshot, StoreData};

/// Serializes the full store snapshot to disk and restores it.
pub struct DiskPersistence {
    path: PathBuf,
}

impl DiskPersistence {
    /// Create a persistence manager writing to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The document path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The backup path: the document path with a `.bak` suffix.
    pub fn backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".bak");
        PathBuf::from(name)
    }

    /// Write the snapshot to disk.
    ///
    /// When `create_backup` is set and a previous document exists, it is
    /// copied aside first so at least one prior version survives the save.
    /// Uses the write-to-temp-then-rename pattern so the document is never
    /// partially written.
    pub fn save(&self, snapshot: &Snapshot, create_backup: bool) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        if create_backup && self.path.exists() {
            fs::copy(&self.path, self.backup_path()).map_err(|e| McpError::PersistenceIo {
                path: self.backup_path(),
                message: format!("backup failed: {e}"),
            })?;
            debug!("Previous state document backed up to {:?}", self.backup_path());
        }

        let document: BTreeMap<&str, &StoreData> = snapshot
            .iter()
            .map(|(id, data)| (id.as_str(), data))
            .collect();
        let json =
            serde_json::to_string_pretty(&document).map_err(|e| McpError::PersistenceIo {
                path: self.path.clone(),
                message: e.to_string(),
            })?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, &json)?;
        fs::rename(&temp_path, &self.path)?;

        debug!("State document written to {:?}", self.path);
        Ok(())
    }

    /// Read the document back as raw (store id string → data) pairs.
    ///
    /// Id resolution and merging belong to the engine; a missing or corrupt
    /// document is an error the caller downgrades to "keep current state".
    pub fn load(&self) -> Result<BTreeMap<String, StoreData>> {
        if !self.path.exists() {
            return Err(McpError::PersistenceIo {
                path: self.path.clone(),
                message: "state document does not exist".into(),
            });
        }

        let content = fs::read_to_string(&self.path)?;
        serde_json::from_str(&content).map_err(|e| {
            warn!("State document at {:?} is corrupt: {e}", self.path);
            McpError::PersistenceIo {
                path: self.path.clone(),
                message: e.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreId;
    use serde_json::json;
    use tempfile::TempDir;

    fn snapshot_with(id: StoreId, field: &str, value: serde_json::Value) -> Snapshot {
        let mut data = StoreData::new();
        data.insert(field.to_string(), value);
        let mut snapshot = Snapshot::new();
        snapshot.insert(id, data);
        snapshot
    }

    #[test]
    fn save_and_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let disk = DiskPersistence::new(temp.path().join("mcp_state.json"));

        let snapshot = snapshot_with(StoreId::Losses, "perdas", json!(12.5));
        disk.save(&snapshot, false).unwrap();

        let loaded = disk.load().unwrap();
        assert_eq!(loaded["losses-store"]["perdas"], json!(12.5));
    }

    #[test]
    fn load_missing_document_fails() {
        let temp = TempDir::new().unwrap();
        let disk = DiskPersistence::new(temp.path().join("missing.json"));
        assert!(disk.load().is_err());
    }

    #[test]
    fn load_corrupt_document_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("mcp_state.json");
        fs::write(&path, "{ not json").unwrap();
        let disk = DiskPersistence::new(path);
        assert!(matches!(disk.load(), Err(McpError::PersistenceIo { .. })));
    }

    #[test]
    fn backup_preserves_previous_document() {
        let temp = TempDir::new().unwrap();
        let disk = DiskPersistence::new(temp.path().join("mcp_state.json"));

        disk.save(&snapshot_with(StoreId::Losses, "v", json!(1)), true)
            .unwrap();
        disk.save(&snapshot_with(StoreId::Losses, "v", json!(2)), true)
            .unwrap();

        let backup = fs::read_to_string(disk.backup_path()).unwrap();
        let previous: BTreeMap<String, StoreData> = serde_json::from_str(&backup).unwrap();
        assert_eq!(previous["losses-store"]["v"], json!(1));

        let current = disk.load().unwrap();
        assert_eq!(current["losses-store"]["v"], json!(2));
    }

    #[test]
    fn save_leaves_no_temp_file() {
        let temp = TempDir::new().unwrap();
        let disk = DiskPersistence::new(temp.path().join("mcp_state.json"));
        disk.save(&snapshot_with(StoreId::Losses, "v", json!(1)), true)
            .unwrap();
        assert!(!temp.path().join("mcp_state.json.tmp").exists());
    }
}
