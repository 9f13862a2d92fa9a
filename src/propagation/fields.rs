//! Field sets governing propagation.
//!
//! These tables are fixed: they encode which fields belong to the single
//! source of truth, which insulation-level fields may flow back from a test
//! module, and which module stores depend on each other.

use serde_json::Value;

use crate::store::{StoreData, StoreId};

/// Fields owned by the authoritative store. Dependent stores only ever see
/// them through their linked `transformer_data` sub-mapping.
pub const AUTHORITATIVE_FIELDS: &[&str] = &[
    // Basic transformer data
    "potencia_mva",
    "tensao_at",
    "tensao_bt",
    "tensao_terciario",
    "corrente_nominal_at",
    "corrente_nominal_bt",
    "corrente_nominal_terciario",
    "corrente_nominal_at_tap_maior",
    "corrente_nominal_at_tap_menor",
    "tipo_transformador",
    "frequencia",
    "impedancia",
    "impedancia_tap_maior",
    "impedancia_tap_menor",
    "grupo_ligacao",
    "conexao_at",
    "conexao_bt",
    "conexao_terciario",
    "classe_tensao_at",
    "classe_tensao_bt",
    "classe_tensao_terciario",
    "liquido_isolante",
    "tipo_isolamento",
    "elevacao_oleo_topo",
    "elevacao_enrol",
    "elevacao_enrol_at",
    "elevacao_enrol_bt",
    "elevacao_enrol_terciario",
    "peso_total",
    "peso_parte_ativa",
    "peso_oleo",
    "peso_tanque_acessorios",
    // Insulation levels are basic data too
    "nbi_at",
    "sil_at",
    "nbi_bt",
    "sil_bt",
    "nbi_terciario",
    "sil_terciario",
    "nbi_neutro_at",
    "sil_neutro_at",
    "nbi_neutro_bt",
    "sil_neutro_bt",
    "nbi_neutro_terciario",
    "sil_neutro_terciario",
    "teste_tensao_aplicada_at",
    "teste_tensao_induzida_at",
    "teste_tensao_aplicada_bt",
    "teste_tensao_aplicada_terciario",
    "teste_tensao_induzida",
];

/// Subset of [`AUTHORITATIVE_FIELDS`] that may originate from a dependent
/// store's own insulation-level inputs and must be reconciled back into the
/// authoritative store.
pub const ISOLATION_FIELDS: &[&str] = &[
    "nbi_at",
    "sil_at",
    "teste_tensao_aplicada_at",
    "teste_tensao_induzida_at",
    "nbi_neutro_at",
    "sil_neutro_at",
    "nbi_bt",
    "sil_bt",
    "teste_tensao_aplicada_bt",
    "nbi_neutro_bt",
    "sil_neutro_bt",
    "nbi_terciario",
    "sil_terciario",
    "teste_tensao_aplicada_terciario",
    "nbi_neutro_terciario",
    "sil_neutro_terciario",
];

/// Fields that must be filled before the state is worth persisting.
pub const ESSENTIAL_FIELDS: &[&str] = &[
    "potencia_mva",
    "tensao_at",
    "tensao_bt",
    "corrente_nominal_at",
    "corrente_nominal_bt",
];

/// Whether a field belongs to the single source of truth.
pub fn is_authoritative_field(field: &str) -> bool {
    AUTHORITATIVE_FIELDS.contains(&field)
}

/// Whether a field is an insulation level allowed to flow back.
pub fn is_isolation_field(field: &str) -> bool {
    ISOLATION_FIELDS.contains(&field)
}

/// Dependent stores whose calculations read the origin module's outputs.
///
/// The comprehensive-analysis store always receives module data; the pairs
/// below mirror the physical coupling between tests (losses feed both the
/// short-circuit and the temperature-rise calculations, and so on).
pub fn related_stores(origin: StoreId) -> Vec<StoreId> {
    let mut targets = vec![StoreId::ComprehensiveAnalysis];
    match origin {
        StoreId::Losses => {
            targets.extend([StoreId::ShortCircuit, StoreId::TemperatureRise]);
        }
        StoreId::Impulse => targets.push(StoreId::DieletricAnalysis),
        StoreId::DieletricAnalysis => {
            targets.extend([StoreId::AppliedVoltage, StoreId::InducedVoltage]);
        }
        StoreId::AppliedVoltage => targets.push(StoreId::InducedVoltage),
        StoreId::InducedVoltage => targets.push(StoreId::AppliedVoltage),
        StoreId::ShortCircuit => targets.push(StoreId::TemperatureRise),
        StoreId::TemperatureRise => targets.push(StoreId::ShortCircuit),
        _ => {}
    }
    targets.retain(|t| *t != origin);
    targets
}

/// The essential fields missing from the data, in declaration order.
///
/// Null, empty string and zero all count as missing here: a transformer with
/// no rated power or voltage is not a transformer yet.
pub fn missing_essential_fields(data: &StoreData) -> Vec<&'static str> {
    ESSENTIAL_FIELDS
        .iter()
        .filter(|field| match data.get(**field) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(Value::Number(n)) => n.as_f64().is_none_or(|f| f == 0.0),
            Some(_) => false,
        })
        .copied()
        .collect()
}

/// Check that every essential field is present with a usable value.
pub fn essential_data_ok(data: &StoreData) -> bool {
    missing_essential_fields(data).is_empty()
}
