//! Argument value definitions
//!
//! This module provides the value model for operation arguments and the
//! conversions from common Rust types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Value of a single operation argument, classified by shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArgValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Uuid(Uuid),
    Timestamp(chrono::DateTime<chrono::Utc>),
    Decimal(String), // Store as string to preserve precision
    /// Structured, non-scalar value (object or array), keys sorted
    Object(serde_json::Value),
    /// Structured value explicitly tagged as a query/filter descriptor
    Filter(serde_json::Value),
    Null,
    /// The value could not be serialized; carries the serializer's message
    Invalid(String),
}

impl ArgValue {
    /// True for primitive values that render directly into a key segment
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            ArgValue::Text(_)
                | ArgValue::Integer(_)
                | ArgValue::Float(_)
                | ArgValue::Boolean(_)
                | ArgValue::Uuid(_)
                | ArgValue::Timestamp(_)
                | ArgValue::Decimal(_)
        )
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, ArgValue::Object(_) | ArgValue::Filter(_))
    }

    pub fn is_filter(&self) -> bool {
        matches!(self, ArgValue::Filter(_))
    }

    /// Plain-text rendering of a scalar; `Null` renders empty
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            ArgValue::Text(s) | ArgValue::Decimal(s) => Some(s.clone()),
            ArgValue::Integer(i) => Some(i.to_string()),
            ArgValue::Float(f) => Some(f.to_string()),
            ArgValue::Boolean(b) => Some(b.to_string()),
            ArgValue::Uuid(u) => Some(u.hyphenated().to_string()),
            ArgValue::Timestamp(ts) => Some(ts.to_rfc3339()),
            ArgValue::Null => Some(String::new()),
            ArgValue::Object(_) | ArgValue::Filter(_) | ArgValue::Invalid(_) => None,
        }
    }

    /// Canonical JSON text: compact, object keys sorted at every depth
    pub fn canonical_json(&self) -> Result<String, serde_json::Error> {
        let value = match self {
            ArgValue::Object(v) | ArgValue::Filter(v) => crate::serialize::sort_keys(v.clone()),
            ArgValue::Text(s) | ArgValue::Decimal(s) => serde_json::Value::String(s.clone()),
            ArgValue::Integer(i) => serde_json::Value::from(*i),
            ArgValue::Float(f) => serde_json::Value::from(*f),
            ArgValue::Boolean(b) => serde_json::Value::Bool(*b),
            ArgValue::Uuid(u) => serde_json::to_value(u)?,
            ArgValue::Timestamp(ts) => serde_json::to_value(ts)?,
            ArgValue::Null => serde_json::Value::Null,
            ArgValue::Invalid(message) => {
                return Err(<serde_json::Error as serde::ser::Error>::custom(message));
            }
        };
        serde_json::to_string(&value)
    }
}

impl From<String> for ArgValue {
    fn from(val: String) -> Self {
        ArgValue::Text(val)
    }
}

impl From<&str> for ArgValue {
    fn from(val: &str) -> Self {
        ArgValue::Text(val.to_string())
    }
}

impl From<i16> for ArgValue {
    fn from(val: i16) -> Self {
        ArgValue::Integer(val.into())
    }
}

impl From<i32> for ArgValue {
    fn from(val: i32) -> Self {
        ArgValue::Integer(val.into())
    }
}

impl From<i64> for ArgValue {
    fn from(val: i64) -> Self {
        ArgValue::Integer(val)
    }
}

impl From<u32> for ArgValue {
    fn from(val: u32) -> Self {
        ArgValue::Integer(val.into())
    }
}

impl From<u64> for ArgValue {
    fn from(val: u64) -> Self {
        match i64::try_from(val) {
            Ok(i) => ArgValue::Integer(i),
            Err(_) => ArgValue::Decimal(val.to_string()),
        }
    }
}

impl From<f64> for ArgValue {
    fn from(val: f64) -> Self {
        ArgValue::Float(val)
    }
}

impl From<bool> for ArgValue {
    fn from(val: bool) -> Self {
        ArgValue::Boolean(val)
    }
}

impl From<Uuid> for ArgValue {
    fn from(val: Uuid) -> Self {
        ArgValue::Uuid(val)
    }
}

impl From<chrono::DateTime<chrono::Utc>> for ArgValue {
    fn from(val: chrono::DateTime<chrono::Utc>) -> Self {
        ArgValue::Timestamp(val)
    }
}

impl From<serde_json::Value> for ArgValue {
    fn from(val: serde_json::Value) -> Self {
        crate::serialize::json_to_arg_value(val)
    }
}

impl<T> From<Option<T>> for ArgValue
where
    T: Into<ArgValue>,
{
    fn from(val: Option<T>) -> Self {
        match val {
            Some(v) => v.into(),
            None => ArgValue::Null,
        }
    }
}
