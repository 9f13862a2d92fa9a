//! Engine health reporting.
//!
//! [`diagnose`] walks every store and summarizes its fill state, flagging
//! the authoritative store when essential fields are missing. The report
//! renders through `Display` for the CLI `status` command.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::engine::Mcp;
use crate::propagation::missing_essential_fields;
use crate::store::{StoreData, StoreId, LINKED_DATA_KEY};

/// Overall health of the engine's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Authoritative data present and complete.
    Ok,
    /// Data present but essential fields missing or stores out of sync.
    Warning,
}

/// Per-store fill state.
#[derive(Debug, Clone, Serialize)]
pub struct StoreDiagnosis {
    pub store_id: StoreId,
    pub field_count: usize,
    pub non_null_count: usize,
    pub has_linked_data: bool,
}

/// The full health report.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosisReport {
    pub timestamp: DateTime<Utc>,
    pub status: HealthStatus,
    pub stores: Vec<StoreDiagnosis>,
    /// Essential authoritative fields that are missing or null.
    pub missing_essential: Vec<&'static str>,
}

/// Diagnose the engine's current state.
pub fn diagnose(mcp: &Mcp) -> DiagnosisReport {
    let snapshot = mcp.get_all();

    let mut stores = Vec::with_capacity(snapshot.len());
    for (id, data) in &snapshot {
        let diagnosis = diagnose_store(*id, data);
        if diagnosis.field_count == 0 {
            debug!("Store {id} is empty");
        }
        stores.push(diagnosis);
    }

    let missing_essential = match snapshot.get(&StoreId::AUTHORITATIVE) {
        Some(auth) => missing_essential_fields(auth),
        None => missing_essential_fields(&StoreData::new()),
    };

    let status = if missing_essential.is_empty() {
        HealthStatus::Ok
    } else {
        warn!(
            "Essential fields missing from {}: {missing_essential:?}",
            StoreId::AUTHORITATIVE
        );
        HealthStatus::Warning
    };

    DiagnosisReport {
        timestamp: Utc::now(),
        status,
        stores,
        missing_essential,
    }
}

fn diagnose_store(store_id: StoreId, data: &StoreData) -> StoreDiagnosis {
    StoreDiagnosis {
        store_id,
        field_count: data.len(),
        non_null_count: data.values().filter(|v| !v.is_null()).count(),
        has_linked_data: data
            .get(LINKED_DATA_KEY)
            .is_some_and(Value::is_object),
    }
}

impl fmt::Display for DiagnosisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Status: {}",
            match self.status {
                HealthStatus::Ok => "ok",
                HealthStatus::Warning => "warning",
            }
        )?;
        if !self.missing_essential.is_empty() {
            writeln!(f, "Missing essential fields: {}", self.missing_essential.join(", "))?;
        }
        writeln!(f, "Stores:")?;
        for store in &self.stores {
            write!(
                f,
                "  {:<32} {:>3} fields, {:>3} non-null",
                store.store_id.as_str(),
                store.field_count,
                store.non_null_count
            )?;
            if store.has_linked_data {
                write!(f, ", linked data present")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::McpConfig;
    use serde_json::json;
    use tempfile::TempDir;

    fn engine(temp: &TempDir) -> Mcp {
        Mcp::new(McpConfig::at(temp.path()))
    }

    #[test]
    fn fresh_engine_reports_missing_essentials() {
        let temp = TempDir::new().unwrap();
        let mcp = engine(&temp);

        let report = diagnose(&mcp);
        assert_eq!(report.status, HealthStatus::Warning);
        assert!(report.missing_essential.contains(&"potencia_mva"));
        assert_eq!(report.stores.len(), crate::store::StoreId::ALL.len());
    }

    #[test]
    fn complete_essentials_report_ok() {
        let temp = TempDir::new().unwrap();
        let mcp = engine(&temp);

        let mut data = mcp.get(StoreId::TransformerInputs);
        data.insert("potencia_mva".into(), json!(100.0));
        data.insert("tensao_at".into(), json!(138.0));
        data.insert("tensao_bt".into(), json!(13.8));
        data.insert("corrente_nominal_at".into(), json!(418.4));
        data.insert("corrente_nominal_bt".into(), json!(4183.7));
        mcp.set(StoreId::TransformerInputs, data, false);

        let report = diagnose(&mcp);
        assert_eq!(report.status, HealthStatus::Ok);
        assert!(report.missing_essential.is_empty());
    }

    #[test]
    fn linked_data_is_flagged() {
        let temp = TempDir::new().unwrap();
        let mcp = engine(&temp);

        let mut data = StoreData::new();
        data.insert(LINKED_DATA_KEY.into(), json!({"potencia_mva": 100.0}));
        mcp.set(StoreId::Losses, data, false);

        let report = diagnose(&mcp);
        let losses = report
            .stores
            .iter()
            .find(|s| s.store_id == StoreId::Losses)
            .unwrap();
        assert!(losses.has_linked_data);
    }

    #[test]
    fn report_renders_every_store() {
        let temp = TempDir::new().unwrap();
        let mcp = engine(&temp);

        let rendered = diagnose(&mcp).to_string();
        assert!(rendered.contains("transformer-inputs-store"));
        assert!(rendered.contains("losses-store"));
    }
}
