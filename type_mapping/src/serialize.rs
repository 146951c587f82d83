//! Serialization utilities
//!
//! This module provides serialization functions
//! for converting Rust values into argument values.

use crate::types::ArgValue;
use serde::Serialize;

/// Convert serializable data to an ArgValue, classifying it by shape.
///
/// Serialization errors are kept as `ArgValue::Invalid` so that key
/// derivation can refuse to cache instead of guessing a key.
pub fn serialize_to_arg_value<T: Serialize + ?Sized>(data: &T) -> ArgValue {
    match serde_json::to_value(data) {
        Ok(value) => json_to_arg_value(value),
        Err(e) => ArgValue::Invalid(e.to_string()),
    }
}

/// Serialize a value as a query/filter descriptor
pub fn serialize_to_filter<T: Serialize + ?Sized>(data: &T) -> ArgValue {
    match serde_json::to_value(data) {
        Ok(value) => ArgValue::Filter(sort_keys(value)),
        Err(e) => ArgValue::Invalid(e.to_string()),
    }
}

pub(crate) fn json_to_arg_value(value: serde_json::Value) -> ArgValue {
    match value {
        serde_json::Value::String(s) => ArgValue::Text(s),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                ArgValue::Integer(i)
            } else if let Some(u) = n.as_u64() {
                ArgValue::Decimal(u.to_string())
            } else if let Some(f) = n.as_f64() {
                ArgValue::Float(f)
            } else {
                ArgValue::Decimal(n.to_string())
            }
        }
        serde_json::Value::Bool(b) => ArgValue::Boolean(b),
        serde_json::Value::Null => ArgValue::Null,
        other => ArgValue::Object(sort_keys(other)),
    }
}

/// Rebuild a JSON value with object keys in lexicographic order at every depth
pub(crate) fn sort_keys(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut entries: Vec<(String, serde_json::Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));

            let mut sorted = serde_json::Map::with_capacity(entries.len());
            for (key, value) in entries {
                sorted.insert(key, sort_keys(value));
            }
            serde_json::Value::Object(sorted)
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(sort_keys).collect())
        }
        other => other,
    }
}
