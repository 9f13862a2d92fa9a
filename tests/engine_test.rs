//! Integration tests for the engine's propagation and history behavior.

use serde_json::json;
use tempfile::TempDir;
use trafomcp::engine::{Mcp, McpConfig};
use trafomcp::store::{StoreData, StoreId, LINKED_DATA_KEY};

fn engine(temp: &TempDir) -> Mcp {
    Mcp::new(McpConfig::at(temp.path()))
}

fn data(pairs: &[(&str, serde_json::Value)]) -> StoreData {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn authoritative_write_reaches_every_module_store() {
    let temp = TempDir::new().unwrap();
    let mcp = engine(&temp);

    let mut inputs = mcp.get(StoreId::TransformerInputs);
    inputs.insert("potencia_mva".into(), json!(100.0));
    inputs.insert("tensao_at".into(), json!(138.0));
    mcp.set(StoreId::TransformerInputs, inputs, true);

    for id in StoreId::MODULES.into_iter().filter(|id| !id.is_authoritative()) {
        let store = mcp.get(id);
        let linked = store[LINKED_DATA_KEY].as_object().unwrap();
        assert_eq!(linked["potencia_mva"], json!(100.0), "missing in {id}");
        assert_eq!(linked["tensao_at"], json!(138.0), "missing in {id}");
    }
}

#[test]
fn null_authoritative_fields_are_not_pushed() {
    let temp = TempDir::new().unwrap();
    let mcp = engine(&temp);

    let mut inputs = mcp.get(StoreId::TransformerInputs);
    inputs.insert("potencia_mva".into(), json!(100.0));
    // impedancia stays null in the defaults.
    mcp.set(StoreId::TransformerInputs, inputs, true);

    let losses = mcp.get(StoreId::Losses);
    let linked = losses[LINKED_DATA_KEY].as_object().unwrap();
    assert!(!linked.contains_key("impedancia"));
}

#[test]
fn module_input_fields_are_copied_verbatim_to_top_level() {
    let temp = TempDir::new().unwrap();
    let mcp = engine(&temp);

    let mut inputs = mcp.get(StoreId::TransformerInputs);
    inputs.insert("potencia_mva".into(), json!(100.0));
    inputs.insert("inputs_losses".into(), json!({"perdas_vazio": 20.0}));
    mcp.set(StoreId::TransformerInputs, inputs, true);

    let losses = mcp.get(StoreId::Losses);
    assert_eq!(losses["inputs_losses"]["perdas_vazio"], json!(20.0));
    // Not nested under the linked sub-mapping.
    let linked = losses[LINKED_DATA_KEY].as_object().unwrap();
    assert!(!linked.contains_key("inputs_losses"));
}

#[test]
fn isolation_value_entered_on_a_test_page_reconciles_back() {
    let temp = TempDir::new().unwrap();
    let mcp = engine(&temp);

    let losses = data(&[(LINKED_DATA_KEY, json!({"nbi_at": "550"}))]);
    mcp.set(StoreId::Losses, losses, true);

    let auth = mcp.get(StoreId::TransformerInputs);
    assert_eq!(auth["nbi_at"], json!("550"));
}

#[test]
fn null_or_blank_never_overwrites_a_real_isolation_value() {
    let temp = TempDir::new().unwrap();
    let mcp = engine(&temp);

    mcp.set(
        StoreId::Losses,
        data(&[(LINKED_DATA_KEY, json!({"nbi_at": "550"}))]),
        true,
    );

    mcp.set(
        StoreId::Losses,
        data(&[(LINKED_DATA_KEY, json!({"nbi_at": null}))]),
        true,
    );
    assert_eq!(mcp.get(StoreId::TransformerInputs)["nbi_at"], json!("550"));

    mcp.set(
        StoreId::Losses,
        data(&[(LINKED_DATA_KEY, json!({"nbi_at": "  "}))]),
        true,
    );
    assert_eq!(mcp.get(StoreId::TransformerInputs)["nbi_at"], json!("550"));
}

#[test]
fn module_outputs_forward_only_along_the_dependency_table() {
    let temp = TempDir::new().unwrap();
    let mcp = engine(&temp);

    let losses = data(&[("perdas_totais", json!(1234.5))]);
    mcp.set(StoreId::Losses, losses, true);

    for dependent in [StoreId::ShortCircuit, StoreId::TemperatureRise] {
        let store = mcp.get(dependent);
        let linked = store[LINKED_DATA_KEY].as_object().unwrap();
        assert_eq!(linked["perdas_totais"], json!(1234.5), "missing in {dependent}");
    }

    // Comprehensive analysis always receives module data.
    let comprehensive = mcp.get(StoreId::ComprehensiveAnalysis);
    let linked = comprehensive[LINKED_DATA_KEY].as_object().unwrap();
    assert_eq!(linked["perdas_totais"], json!(1234.5));

    // Impulse is unrelated to losses.
    let impulse = mcp.get(StoreId::Impulse);
    assert!(impulse.is_empty());
}

#[test]
fn authoritative_fields_never_forward_from_a_dependent_origin() {
    let temp = TempDir::new().unwrap();
    let mcp = engine(&temp);

    // A dependent store carrying a stale top-level copy must not spread it.
    let losses = data(&[("potencia_mva", json!(999.0)), ("perdas_totais", json!(1.0))]);
    mcp.set(StoreId::Losses, losses, true);

    let short_circuit = mcp.get(StoreId::ShortCircuit);
    let linked = short_circuit[LINKED_DATA_KEY].as_object().unwrap();
    assert!(!linked.contains_key("potencia_mva"));
    assert_eq!(linked["perdas_totais"], json!(1.0));
}

#[test]
fn worked_example_full_cycle() {
    let temp = TempDir::new().unwrap();
    let mcp = engine(&temp);

    // Nameplate entered on the inputs page.
    let mut inputs = mcp.get(StoreId::TransformerInputs);
    inputs.insert("potencia_mva".into(), json!(100.0));
    inputs.insert("tensao_at".into(), json!(138.0));
    mcp.set(StoreId::TransformerInputs, inputs, true);

    let losses = mcp.get(StoreId::Losses);
    assert_eq!(losses[LINKED_DATA_KEY]["potencia_mva"], json!(100.0));

    // Insulation level entered on the losses page flows back, then out again.
    let mut losses = mcp.get(StoreId::Losses);
    let mut linked = losses[LINKED_DATA_KEY].as_object().unwrap().clone();
    linked.insert("nbi_at".into(), json!("550"));
    losses.insert(LINKED_DATA_KEY.into(), json!(linked));
    mcp.set(StoreId::Losses, losses, true);

    assert_eq!(mcp.get(StoreId::TransformerInputs)["nbi_at"], json!("550"));
    let short_circuit = mcp.get(StoreId::ShortCircuit);
    assert_eq!(short_circuit[LINKED_DATA_KEY]["nbi_at"], json!("550"));
}

#[test]
fn history_is_bounded_at_one_hundred_records_oldest_first() {
    let temp = TempDir::new().unwrap();
    let mcp = engine(&temp);

    for i in 0..150 {
        mcp.set(StoreId::Losses, data(&[("n", json!(i))]), false);
    }

    let history = mcp.get_change_history(None);
    assert_eq!(history.len(), 100);
    // Writes 50..149 survive; each record diffs against the previous value.
    assert_eq!(history[0].changes[0].new, Some(json!(50)));
    assert_eq!(history[99].changes[0].new, Some(json!(149)));

    let last_ten = mcp.get_change_history(Some(10));
    assert_eq!(last_ten.len(), 10);
    assert_eq!(last_ten[0].changes[0].new, Some(json!(140)));
}

#[test]
fn unsubscribe_stops_notifications() {
    let temp = TempDir::new().unwrap();
    let mcp = engine(&temp);

    let count = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = count.clone();
    let handle = mcp.subscribe(
        StoreId::Losses,
        std::sync::Arc::new(move |_, _| {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }),
    );

    mcp.set(StoreId::Losses, data(&[("a", json!(1))]), false);
    assert!(mcp.unsubscribe(handle));
    mcp.set(StoreId::Losses, data(&[("a", json!(2))]), false);

    assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 1);
    // The handle is gone.
    assert!(!mcp.unsubscribe(handle));
}

#[test]
fn listener_can_write_back_into_the_engine() {
    let temp = TempDir::new().unwrap();
    let mcp = std::sync::Arc::new(engine(&temp));

    // A handler deriving a value in another store must not deadlock.
    let engine_ref = mcp.clone();
    mcp.subscribe(
        StoreId::Losses,
        std::sync::Arc::new(move |_, written: &StoreData| {
            let mut derived = StoreData::new();
            derived.insert("fonte".into(), json!(written.len()));
            engine_ref.set(StoreId::Impulse, derived, false);
        }),
    );

    mcp.set(StoreId::Losses, data(&[("perdas_totais", json!(1.0))]), false);

    assert_eq!(mcp.get(StoreId::Impulse)["fonte"], json!(1));
}

#[test]
fn listeners_only_fire_for_their_store() {
    let temp = TempDir::new().unwrap();
    let mcp = engine(&temp);

    let count = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = count.clone();
    mcp.subscribe(
        StoreId::Impulse,
        std::sync::Arc::new(move |_, _| {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }),
    );

    mcp.set(StoreId::Losses, data(&[("a", json!(1))]), false);
    assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[test]
fn clear_all_with_propagation_pushes_defaults_back_out() {
    let temp = TempDir::new().unwrap();
    let mcp = engine(&temp);

    mcp.set(StoreId::Losses, data(&[("perdas_totais", json!(1.0))]), false);
    mcp.clear_all(true);

    let losses = mcp.get(StoreId::Losses);
    assert!(!losses.contains_key("perdas_totais"));
    // Defaults include a non-null transformer type, which propagates.
    assert_eq!(
        losses[LINKED_DATA_KEY]["tipo_transformador"],
        json!("Trifásico")
    );
}

#[test]
fn sync_isolation_values_sweeps_stray_values_into_the_source_of_truth() {
    let temp = TempDir::new().unwrap();
    let mcp = engine(&temp);

    // A value persisted under an older layout: present in a module store's
    // linked data but absent from the authoritative store.
    mcp.set(
        StoreId::AppliedVoltage,
        data(&[(LINKED_DATA_KEY, json!({"teste_tensao_aplicada_at": 230}))]),
        false,
    );

    assert!(mcp.sync_isolation_values());

    let auth = mcp.get(StoreId::TransformerInputs);
    assert_eq!(auth["teste_tensao_aplicada_at"], json!(230));

    // And every other module store now carries it too.
    let induced = mcp.get(StoreId::InducedVoltage);
    assert_eq!(
        induced[LINKED_DATA_KEY]["teste_tensao_aplicada_at"],
        json!(230)
    );
}
