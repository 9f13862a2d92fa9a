//! Value normalization at the engine boundary.
//!
//! The store value model is [`serde_json::Value`], so most serialization
//! hazards are structurally impossible once a value is inside the engine.
//! What remains is the boundary: arbitrary caller types convert through
//! [`to_store_data`], where non-finite floats collapse to null, and every
//! write passes through [`sanitize`] so persisted documents never carry a
//! value that cannot round-trip.

use serde::Serialize;
use serde_json::{Number, Value};

use crate::error::{McpError, Result};
use crate::store::StoreData;

/// Convert any serializable value into store data.
///
/// Non-finite floats become null (the JSON data model has no NaN/Infinity).
/// Fails if the value does not serialize to an object.
pub fn to_store_data<T: Serialize>(value: &T) -> Result<StoreData> {
    let value = serde_json::to_value(value).map_err(|e| McpError::Serialization {
        store: String::new(),
        message: e.to_string(),
    })?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(McpError::Serialization {
            store: String::new(),
            message: format!("expected an object, got {}", type_name(&other)),
        }),
    }
}

/// Normalize a store's data in place.
///
/// Rebuilds every number through [`Number::from_f64`], mapping anything the
/// serializer could not represent to null, and recurses into nested arrays
/// and objects.
pub fn sanitize(data: &mut StoreData) {
    for value in data.values_mut() {
        sanitize_value(value);
    }
}

fn sanitize_value(value: &mut Value) {
    match value {
        Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                if !f.is_finite() {
                    *value = Value::Null;
                } else if n.as_i64().is_none() && n.as_u64().is_none() {
                    match Number::from_f64(f) {
                        Some(rebuilt) => *value = Value::Number(rebuilt),
                        None => *value = Value::Null,
                    }
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                sanitize_value(item);
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                sanitize_value(item);
            }
        }
        _ => {}
    }
}

/// Serialize a store's data to a JSON blob, naming the store on failure.
pub fn to_blob(store: &str, data: &StoreData) -> Result<String> {
    serde_json::to_string(data).map_err(|e| McpError::Serialization {
        store: store.to_string(),
        message: e.to_string(),
    })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Whether a value counts as present: non-null, and for strings, non-blank.
///
/// Used by the reconciliation rules: a null or blank value must never
/// overwrite a real one.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}
