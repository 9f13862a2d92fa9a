//! Propagation and reconciliation passes.
//!
//! Two modes, selected by the origin of a write:
//!
//! **Origin authoritative** - every non-null authoritative field is pushed
//! into each module store's linked `transformer_data` sub-mapping, and
//! `inputs_*` fields are copied verbatim to the target top level.
//!
//! **Origin dependent** - insulation levels entered on a test page are
//! first reconciled back into the authoritative store (a null or blank
//! value never overwrites a real one), then the module's own outputs are
//! forwarded along the adjacency table. Authoritative fields are never
//! forwarded from a dependent origin; they flow only from the source of
//! truth, which avoids ping-pong overwrites.
//!
//! Conflict policy is "last write observed, non-null wins". There are no
//! timestamps; correctness under concurrent writers from several UI pages
//! is a known limitation.

use serde_json::Value;
use tracing::{debug, info, warn};

use super::fields::{is_authoritative_field, related_stores};
use crate::engine::Mcp;
use crate::normalize::is_present;
use crate::store::{StoreData, StoreId, LINKED_DATA_KEY, MODULE_INPUT_PREFIX};

/// React to a write on `origin`: full push when the origin is the
/// authoritative store, reconciliation plus selective forwarding otherwise.
///
/// Returns the targets that were actually updated.
pub fn propagate_on_change(mcp: &Mcp, origin: StoreId) -> Vec<StoreId> {
    if origin.is_authoritative() {
        let targets: Vec<StoreId> = StoreId::MODULES
            .into_iter()
            .filter(|t| !t.is_authoritative())
            .collect();
        push_authoritative(mcp, &targets)
    } else {
        reconcile_isolation(mcp, origin);
        forward_module_data(mcp, origin)
    }
}

/// Push the authoritative store's data to every module store.
///
/// Run at startup and after bulk loads.
pub fn propagate_all(mcp: &Mcp) -> bool {
    let auth_data = mcp.get(StoreId::AUTHORITATIVE);
    if auth_data.is_empty() {
        warn!("Authoritative store is empty; nothing to propagate");
        return false;
    }
    let targets: Vec<StoreId> = StoreId::MODULES
        .into_iter()
        .filter(|t| !t.is_authoritative())
        .collect();
    let updated = push_authoritative(mcp, &targets);
    info!("Propagated authoritative data to {} stores", updated.len());
    true
}

/// Full isolation sweep: gather insulation levels entered on any test page
/// into the authoritative store, then re-sync every module store from it.
///
/// Run once at startup so values persisted under an older layout still reach
/// the source of truth.
pub fn sync_isolation_values(mcp: &Mcp) -> bool {
    let mut auth_data = mcp.get(StoreId::AUTHORITATIVE);
    let mut updated_auth = false;

    for store in StoreId::MODULES {
        if store.is_authoritative() {
            continue;
        }
        let data = mcp.get(store);
        let Some(Value::Object(linked)) = data.get(LINKED_DATA_KEY) else {
            continue;
        };
        for field in super::ISOLATION_FIELDS {
            let Some(value) = linked.get(*field) else {
                continue;
            };
            if is_present(value) && auth_data.get(*field) != Some(value) {
                debug!("Preserving isolation value {field} from {store}");
                auth_data.insert((*field).to_string(), value.clone());
                updated_auth = true;
            }
        }
    }

    if updated_auth {
        mcp.set(StoreId::AUTHORITATIVE, auth_data.clone(), false);
        info!("Authoritative store updated with isolation values");
    }

    for store in StoreId::MODULES {
        if store.is_authoritative() {
            continue;
        }
        let mut target = mcp.get(store);
        if sync_isolation_into(&mut target, &auth_data) {
            mcp.set(store, target, false);
        }
    }

    true
}

/// Mode A: write each non-null authoritative field into the targets' linked
/// sub-mapping and copy module-prefixed inputs verbatim. Targets that did
/// not change are left untouched.
fn push_authoritative(mcp: &Mcp, targets: &[StoreId]) -> Vec<StoreId> {
    let source = mcp.get(StoreId::AUTHORITATIVE);
    if source.is_empty() {
        warn!("Authoritative store is empty; skipping propagation");
        return Vec::new();
    }

    let mut updated = Vec::new();
    for &target_id in targets {
        let mut target = mcp.get(target_id);
        let mut changed = false;

        {
            let linked = linked_data_mut(&mut target);
            for (field, value) in &source {
                if is_authoritative_field(field) && !value.is_null() {
                    changed |= linked.insert(field.clone(), value.clone()) != Some(value.clone());
                }
            }
        }

        for (field, value) in &source {
            if field.starts_with(MODULE_INPUT_PREFIX) && !value.is_null() {
                changed |= target.insert(field.clone(), value.clone()) != Some(value.clone());
            }
        }

        if changed {
            mcp.set(target_id, target, false);
            updated.push(target_id);
            debug!("Authoritative data pushed to {target_id}");
        }
    }
    updated
}

/// Mode B step 1: isolation values entered on the origin page flow back to
/// the authoritative store. Null and blank values never overwrite.
fn reconcile_isolation(mcp: &Mcp, origin: StoreId) {
    let origin_data = mcp.get(origin);
    let Some(Value::Object(linked)) = origin_data.get(LINKED_DATA_KEY) else {
        return;
    };

    let mut auth_data = mcp.get(StoreId::AUTHORITATIVE);
    let mut updated = false;
    for field in super::ISOLATION_FIELDS {
        let Some(value) = linked.get(*field) else {
            continue;
        };
        if is_present(value) && auth_data.get(*field) != Some(value) {
            info!("Reconciling isolation value {field} from {origin}");
            auth_data.insert((*field).to_string(), value.clone());
            updated = true;
        }
    }

    if updated {
        mcp.set(StoreId::AUTHORITATIVE, auth_data, false);
    }
}

/// Mode B step 2: forward the origin module's own outputs to its related
/// stores. Authoritative fields are deliberately excluded; isolation values
/// are re-synced from the source of truth instead.
fn forward_module_data(mcp: &Mcp, origin: StoreId) -> Vec<StoreId> {
    let source = mcp.get(origin);
    if source.is_empty() {
        warn!("Origin store {origin} is empty; nothing to forward");
        return Vec::new();
    }
    let auth_data = mcp.get(StoreId::AUTHORITATIVE);

    let mut updated = Vec::new();
    for target_id in related_stores(origin) {
        let mut target = mcp.get(target_id);
        let mut changed = false;

        {
            let linked = linked_data_mut(&mut target);
            for (field, value) in &source {
                if field == LINKED_DATA_KEY
                    || is_authoritative_field(field)
                    || field.starts_with(MODULE_INPUT_PREFIX)
                    || value.is_null()
                {
                    continue;
                }
                changed |= linked.insert(field.clone(), value.clone()) != Some(value.clone());
            }
        }

        for (field, value) in &source {
            if field.starts_with(MODULE_INPUT_PREFIX) && !value.is_null() {
                changed |= target.insert(field.clone(), value.clone()) != Some(value.clone());
            }
        }

        changed |= sync_isolation_into(&mut target, &auth_data);

        if changed {
            mcp.set(target_id, target, false);
            updated.push(target_id);
            debug!("Module data from {origin} forwarded to {target_id}");
        }
    }
    updated
}

/// Copy every non-null isolation value from the authoritative data into the
/// target's linked sub-mapping. Returns whether anything changed.
fn sync_isolation_into(target: &mut StoreData, auth_data: &StoreData) -> bool {
    let linked = linked_data_mut(target);
    let mut changed = false;
    for field in super::ISOLATION_FIELDS {
        if let Some(value) = auth_data.get(*field) {
            if !value.is_null() {
                changed |= linked.insert((*field).to_string(), value.clone()) != Some(value.clone());
            }
        }
    }
    changed
}

/// Get the target's linked `transformer_data` sub-mapping, creating it (or
/// replacing a non-object value) as needed.
fn linked_data_mut(target: &mut StoreData) -> &mut StoreData {
    if !matches!(target.get(LINKED_DATA_KEY), Some(Value::Object(_))) {
        target.insert(LINKED_DATA_KEY.to_string(), Value::Object(StoreData::new()));
    }
    match target.get_mut(LINKED_DATA_KEY) {
        Some(Value::Object(map)) => map,
        _ => unreachable!("linked data key was just inserted as an object"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> StoreData {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn is_authoritative_field_excludes_module_outputs() {
        assert!(is_authoritative_field("potencia_mva"));
        assert!(!is_authoritative_field("perdas_totais"));
    }

    #[test]
    fn linked_data_mut_creates_and_repairs() {
        let mut target = StoreData::new();
        linked_data_mut(&mut target).insert("a".into(), json!(1));
        assert_eq!(target[LINKED_DATA_KEY]["a"], json!(1));

        // A scalar under the key is replaced by an object.
        let mut broken = object(json!({ LINKED_DATA_KEY: 42 }));
        linked_data_mut(&mut broken).insert("b".into(), json!(2));
        assert_eq!(broken[LINKED_DATA_KEY]["b"], json!(2));
    }

    #[test]
    fn sync_isolation_into_skips_null_values() {
        let auth = object(json!({ "nbi_at": "550", "sil_at": null }));
        let mut target = StoreData::new();
        assert!(sync_isolation_into(&mut target, &auth));
        assert_eq!(target[LINKED_DATA_KEY]["nbi_at"], json!("550"));
        assert!(target[LINKED_DATA_KEY].get("sil_at").is_none());
    }

    #[test]
    fn sync_isolation_into_reports_no_change_when_equal() {
        let auth = object(json!({ "nbi_at": "550" }));
        let mut target = object(json!({ LINKED_DATA_KEY: { "nbi_at": "550" } }));
        assert!(!sync_isolation_into(&mut target, &auth));
    }
}
