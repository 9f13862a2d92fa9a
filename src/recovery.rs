//! Authoritative-data recovery.
//!
//! Covers the failure mode where module stores carry a complete nested
//! copy of the transformer data while the authoritative store itself has
//! lost it (a crash between writes, or a partial disk restore). The most
//! complete nested copy wins and is pushed back out.

use serde_json::Value;
use tracing::{info, warn};

use crate::engine::Mcp;
use crate::store::{StoreData, StoreId, LINKED_DATA_KEY};

/// Find the most complete nested transformer data among the module stores.
///
/// Completeness is the count of non-null fields in the store's linked data
/// map; ties keep the first store in id order. Returns `None` when no
/// module store carries linked data.
pub fn extract_complete_transformer_data(mcp: &Mcp) -> Option<StoreData> {
    let mut best: Option<(StoreId, StoreData, usize)> = None;

    for id in StoreId::MODULES {
        if id.is_authoritative() {
            continue;
        }
        let store_data = mcp.get(id);
        let Some(Value::Object(linked)) = store_data.get(LINKED_DATA_KEY) else {
            continue;
        };

        let non_null = linked.values().filter(|v| !v.is_null()).count();
        if non_null == 0 {
            continue;
        }
        if best.as_ref().is_none_or(|(_, _, max)| non_null > *max) {
            best = Some((id, linked.clone(), non_null));
        }
    }

    match best {
        Some((source, data, count)) => {
            info!("Most complete transformer data found in {source} ({count} non-null fields)");
            Some(data)
        }
        None => {
            warn!("No module store carries recoverable transformer data");
            None
        }
    }
}

/// Repopulate the authoritative store from module-store copies, force-save
/// the repaired state, and re-propagate it everywhere.
///
/// Returns false when no recoverable data exists; the engine is left
/// untouched in that case.
pub fn fix_data_synchronization(mcp: &Mcp) -> bool {
    let Some(recovered) = extract_complete_transformer_data(mcp) else {
        return false;
    };

    mcp.set(StoreId::AUTHORITATIVE, recovered, false);
    info!("Authoritative store repopulated from module data");

    if !mcp.save_to_disk(true) {
        warn!("Recovered state could not be persisted");
    }
    mcp.propagate_all();
    true
}
