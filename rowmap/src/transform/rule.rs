//! Rule definition: how one output field is derived.
//!
//! A rule reads from one source field (`from_key`) or from the whole record
//! (`generator`) and writes one output field (`to_key`). The derivation modes
//! are tried in this order:
//!
//! 1. `generator`, with the whole record
//! 2. absence of `from_key`: an error when `required`, else `default`
//! 3. `converter`, with the source value
//! 4. `mapping`, keyed by the source value
//! 5. verbatim copy

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::BoxError;
use crate::models::{Mapping, MappingKey, Record};

/// Computes a field from the whole source record.
pub type Generator = Arc<dyn Fn(&Record) -> Result<Value, BoxError> + Send + Sync>;

/// Transforms a single source value.
pub type Converter = Arc<dyn Fn(&Value) -> Result<Value, BoxError> + Send + Sync>;

/// Supplies the value of an optional field that is absent from the record.
pub type Supplier = Arc<dyn Fn() -> Value + Send + Sync>;

/// Derivation rule for one output field.
#[derive(Clone, Default)]
pub struct Rule {
    /// Source field name. Empty when the rule does not read a single field.
    pub from_key: String,
    /// Output field name. Must be non-empty and unique within a rule set.
    pub to_key: String,
    /// Absence of `from_key` is an error rather than a default.
    pub required: bool,
    /// Value for an absent optional field. `None` yields `null`.
    pub default: Option<Supplier>,
    pub converter: Option<Converter>,
    /// Takes precedence over every other mode when set.
    pub generator: Option<Generator>,
    pub mapping: Option<Mapping>,
}

impl Rule {
    /// Copy `from_key` to `to_key`.
    pub fn new(from_key: impl Into<String>, to_key: impl Into<String>) -> Self {
        Self {
            from_key: from_key.into(),
            to_key: to_key.into(),
            ..Self::default()
        }
    }

    /// Compute `to_key` from the whole record.
    pub fn generated<F, E>(to_key: impl Into<String>, generator: F) -> Self
    where
        F: Fn(&Record) -> Result<Value, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        Self {
            to_key: to_key.into(),
            ..Self::default()
        }
        .with_generator(generator)
    }

    /// Mark as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default<F>(mut self, supplier: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = Some(Arc::new(supplier));
        self
    }

    /// Use a constant as the default.
    pub fn with_default_value(self, value: Value) -> Self {
        self.with_default(move || value.clone())
    }

    pub fn with_converter<F, E>(mut self, converter: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        self.converter = Some(Arc::new(move |value: &Value| -> Result<Value, BoxError> {
            converter(value).map_err(Into::into)
        }));
        self
    }

    pub fn with_generator<F, E>(mut self, generator: F) -> Self
    where
        F: Fn(&Record) -> Result<Value, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        self.generator = Some(Arc::new(move |record: &Record| -> Result<Value, BoxError> {
            generator(record).map_err(Into::into)
        }));
        self
    }

    pub fn with_mapping<I, K>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<MappingKey>,
    {
        self.mapping = Some(entries.into_iter().map(|(k, v)| (k.into(), v)).collect());
        self
    }

    pub(crate) fn default_value(&self) -> Value {
        self.default.as_ref().map_or(Value::Null, |supplier| supplier())
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("from_key", &self.from_key)
            .field("to_key", &self.to_key)
            .field("required", &self.required)
            .field("default", &self.default.is_some())
            .field("converter", &self.converter.is_some())
            .field("generator", &self.generator.is_some())
            .field("mapping", &self.mapping.as_ref().map(|m| m.len()))
            .finish()
    }
}
