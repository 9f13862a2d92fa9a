//! Store registry and value model.
//!
//! Every piece of engine state lives in one of a closed set of named stores,
//! identified by [`StoreId`]. The authoritative store
//! ([`StoreId::TransformerInputs`]) is the only store initialized with
//! non-empty defaults; it owns the canonical values for the basic transformer
//! fields (see [`crate::propagation::fields`]).

mod history;
mod listeners;
mod state;

pub use history::{ChangeHistory, ChangeRecord, FieldChange};
pub use listeners::{notify_all, Listener, ListenerRegistry, Subscription, SubscriptionHandle};
pub use state::StateStore;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde_json::{json, Map, Value};

use crate::error::McpError;

/// One store's data: a field-name → value mapping.
///
/// Values are [`serde_json::Value`], a tagged union validated at the
/// boundary, so every stored field is serialization-safe by construction.
pub type StoreData = Map<String, Value>;

/// A full snapshot of every store.
pub type Snapshot = BTreeMap<StoreId, StoreData>;

/// Key of the nested sub-mapping that holds values linked from the
/// authoritative store inside each dependent store.
pub const LINKED_DATA_KEY: &str = "transformer_data";

/// Prefix marking module-specific form inputs, copied verbatim between
/// stores during propagation.
pub const MODULE_INPUT_PREFIX: &str = "inputs_";

/// Identifier of a registered store.
///
/// The set is closed: it is the thirteen stores of the transformer test
/// application, fixed at compile time. Textual ids (disk documents, session
/// blobs, CLI arguments) round-trip through [`StoreId::as_str`] and
/// [`FromStr`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StoreId {
    /// The authoritative store: basic transformer inputs.
    TransformerInputs,
    Losses,
    Impulse,
    DieletricAnalysis,
    AppliedVoltage,
    InducedVoltage,
    ShortCircuit,
    TemperatureRise,
    ComprehensiveAnalysis,
    /// Auxiliary impulse-simulation stores.
    FrontResistor,
    TailResistor,
    CalculatedInductance,
    SimulationStatus,
}

impl StoreId {
    /// All registered stores, in initialization order.
    pub const ALL: [StoreId; 13] = [
        StoreId::TransformerInputs,
        StoreId::Losses,
        StoreId::Impulse,
        StoreId::DieletricAnalysis,
        StoreId::AppliedVoltage,
        StoreId::InducedVoltage,
        StoreId::ShortCircuit,
        StoreId::TemperatureRise,
        StoreId::ComprehensiveAnalysis,
        StoreId::FrontResistor,
        StoreId::TailResistor,
        StoreId::CalculatedInductance,
        StoreId::SimulationStatus,
    ];

    /// The module stores that participate in propagation.
    pub const MODULES: [StoreId; 9] = [
        StoreId::TransformerInputs,
        StoreId::Losses,
        StoreId::Impulse,
        StoreId::DieletricAnalysis,
        StoreId::AppliedVoltage,
        StoreId::InducedVoltage,
        StoreId::ShortCircuit,
        StoreId::TemperatureRise,
        StoreId::ComprehensiveAnalysis,
    ];

    /// The single source of truth for basic transformer fields.
    pub const AUTHORITATIVE: StoreId = StoreId::TransformerInputs;

    /// The stable textual id used in persisted documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreId::TransformerInputs => "transformer-inputs-store",
            StoreId::Losses => "losses-store",
            StoreId::Impulse => "impulse-store",
            StoreId::DieletricAnalysis => "dieletric-analysis-store",
            StoreId::AppliedVoltage => "applied-voltage-store",
            StoreId::InducedVoltage => "induced-voltage-store",
            StoreId::ShortCircuit => "short-circuit-store",
            StoreId::TemperatureRise => "temperature-rise-store",
            StoreId::ComprehensiveAnalysis => "comprehensive-analysis-store",
            StoreId::FrontResistor => "front-resistor-data",
            StoreId::TailResistor => "tail-resistor-data",
            StoreId::CalculatedInductance => "calculated-inductance",
            StoreId::SimulationStatus => "simulation-status",
        }
    }

    /// Whether this store owns the canonical basic fields.
    pub fn is_authoritative(&self) -> bool {
        *self == Self::AUTHORITATIVE
    }
}

impl serde::Serialize for StoreId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreId {
    type Err = McpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StoreId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| McpError::UnknownStore { id: s.to_string() })
    }
}

/// Default data for the authoritative store.
///
/// Mirrors the application's documented defaults: a three-phase, 60 Hz,
/// mineral-oil transformer with uniform insulation; every other field starts
/// null and is filled in by the input form.
pub fn default_transformer_inputs() -> StoreData {
    let defaults = json!({
        "tipo_transformador": "Trifásico",
        "frequencia": 60.0,
        "conexao_at": null,
        "conexao_bt": null,
        "conexao_terciario": "",
        "liquido_isolante": "Mineral",
        "tipo_isolamento": "uniforme",
        "potencia_mva": null,
        "grupo_ligacao": null,
        "elevacao_oleo_topo": null,
        "elevacao_enrol": null,
        "tensao_at": null,
        "classe_tensao_at": null,
        "elevacao_enrol_at": null,
        "impedancia": null,
        "nbi_at": null,
        "sil_at": null,
        "tensao_at_tap_maior": null,
        "impedancia_tap_maior": null,
        "tensao_at_tap_menor": null,
        "impedancia_tap_menor": null,
        "teste_tensao_aplicada_at": null,
        "teste_tensao_induzida_at": null,
        "teste_tensao_induzida": null,
        "tensao_bt": null,
        "classe_tensao_bt": null,
        "elevacao_enrol_bt": null,
        "nbi_bt": null,
        "sil_bt": null,
        "teste_tensao_aplicada_bt": null,
        "tensao_terciario": null,
        "classe_tensao_terciario": null,
        "elevacao_enrol_terciario": null,
        "nbi_terciario": null,
        "sil_terciario": null,
        "teste_tensao_aplicada_terciario": null,
        "tensao_bucha_neutro_at": null,
        "tensao_bucha_neutro_bt": null,
        "tensao_bucha_neutro_terciario": null,
        "nbi_neutro_at": null,
        "nbi_neutro_bt": null,
        "nbi_neutro_terciario": null,
        "peso_total": null,
        "peso_parte_ativa": null,
        "peso_oleo": null,
        "peso_tanque_acessorios": null,
        "corrente_nominal_at": null,
        "corrente_nominal_at_tap_maior": null,
        "corrente_nominal_at_tap_menor": null,
        "corrente_nominal_bt": null,
        "corrente_nominal_terciario": null
    });

    match defaults {
        Value::Object(map) => map,
        _ => unreachable!("defaults literal is an object"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_id_round_trips_through_str() {
        for id in StoreId::ALL {
            let parsed: StoreId = id.as_str().parse().unwrap();
            assert_eq!(parsed, id);
        }
    }

    #[test]
    fn unknown_id_fails_to_parse() {
        let result = "mystery-store".parse::<StoreId>();
        assert!(matches!(result, Err(McpError::UnknownStore { .. })));
    }

    #[test]
    fn authoritative_is_transformer_inputs() {
        assert!(StoreId::TransformerInputs.is_authoritative());
        assert!(!StoreId::Losses.is_authoritative());
    }

    #[test]
    fn modules_are_a_subset_of_all() {
        for id in StoreId::MODULES {
            assert!(StoreId::ALL.contains(&id));
        }
    }

    #[test]
    fn defaults_have_documented_values() {
        let defaults = default_transformer_inputs();
        assert_eq!(defaults["tipo_transformador"], json!("Trifásico"));
        assert_eq!(defaults["frequencia"], json!(60.0));
        assert_eq!(defaults["liquido_isolante"], json!("Mineral"));
        assert!(defaults["potencia_mva"].is_null());
        assert!(defaults["tensao_at"].is_null());
    }

    #[test]
    fn display_matches_as_str() {
        assert_eq!(StoreId::Losses.to_string(), "losses-store");
    }
}
