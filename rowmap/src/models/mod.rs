//! Data model shared by the engine and the declarative layer.
//!
//! - [`Record`] - One row of loosely-typed input or output data
//! - [`MappingKey`] - Hashable projection of a scalar JSON value
//! - [`Mapping`] - Static lookup table used by mapping rules

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;

/// A record: field name to arbitrary JSON value.
pub type Record = serde_json::Map<String, Value>;

/// Lookup table from raw source value to output value.
pub type Mapping = HashMap<MappingKey, Value>;

// =============================================================================
// Mapping Keys
// =============================================================================

/// A JSON scalar in a form usable as a hash map key.
///
/// Numbers are keyed by their canonical text, so `1` and `1.0` are distinct
/// keys. Arrays and objects have no key form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MappingKey {
    Null,
    Bool(bool),
    Number(String),
    String(String),
}

impl MappingKey {
    /// Project a JSON value onto a key, or report the kind of value that has none.
    pub fn from_value(value: &Value) -> Result<Self, &'static str> {
        match value {
            Value::Null => Ok(MappingKey::Null),
            Value::Bool(b) => Ok(MappingKey::Bool(*b)),
            Value::Number(n) => Ok(MappingKey::Number(n.to_string())),
            Value::String(s) => Ok(MappingKey::String(s.clone())),
            Value::Array(_) | Value::Object(_) => Err(value_kind(value)),
        }
    }
}

impl TryFrom<&Value> for MappingKey {
    type Error = &'static str;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        MappingKey::from_value(value)
    }
}

impl From<&str> for MappingKey {
    fn from(s: &str) -> Self {
        MappingKey::String(s.to_string())
    }
}

impl From<String> for MappingKey {
    fn from(s: String) -> Self {
        MappingKey::String(s)
    }
}

impl From<bool> for MappingKey {
    fn from(b: bool) -> Self {
        MappingKey::Bool(b)
    }
}

impl From<i64> for MappingKey {
    fn from(n: i64) -> Self {
        MappingKey::Number(n.to_string())
    }
}

impl fmt::Display for MappingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingKey::Null => f.write_str("null"),
            MappingKey::Bool(b) => write!(f, "{}", b),
            MappingKey::Number(n) => f.write_str(n),
            MappingKey::String(s) => write!(f, "{:?}", s),
        }
    }
}

/// Short name of a JSON value's type, for messages.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
