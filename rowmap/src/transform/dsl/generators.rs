//! Built-in generators: fields computed from several source fields at once.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GeneratorError;
use crate::models::Record;

/// Whole-record generator usable from a JSON rule set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeneratorSpec {
    /// Join the non-empty text of several source fields.
    Concat {
        sources: Vec<String>,
        #[serde(default = "default_concat_separator")]
        separator: String,
    },

    /// First source field that is present and not null.
    Coalesce { sources: Vec<String> },

    /// Always the same value.
    Constant { value: Value },
}

fn default_concat_separator() -> String {
    " ".to_string()
}

impl GeneratorSpec {
    pub fn concat(sources: &[&str], separator: &str) -> Self {
        GeneratorSpec::Concat {
            sources: sources.iter().map(|s| s.to_string()).collect(),
            separator: separator.to_string(),
        }
    }

    /// Source fields read by this generator.
    pub fn sources(&self) -> &[String] {
        match self {
            GeneratorSpec::Concat { sources, .. } | GeneratorSpec::Coalesce { sources } => sources,
            GeneratorSpec::Constant { .. } => &[],
        }
    }

    pub fn generate(&self, record: &Record) -> Result<Value, GeneratorError> {
        match self {
            GeneratorSpec::Concat { sources, separator } => {
                let parts: Vec<String> = sources
                    .iter()
                    .filter_map(|s| record.get(s))
                    .filter_map(text_of)
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();

                if parts.is_empty() {
                    Err(GeneratorError::AllSourcesEmpty(sources.clone()))
                } else {
                    Ok(Value::String(parts.join(separator)))
                }
            }
            GeneratorSpec::Coalesce { sources } => sources
                .iter()
                .filter_map(|s| record.get(s))
                .find(|v| !v.is_null())
                .cloned()
                .ok_or_else(|| GeneratorError::NoSourcePresent(sources.clone())),
            GeneratorSpec::Constant { value } => Ok(value.clone()),
        }
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
