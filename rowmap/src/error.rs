//! Error types for the rowmap conversion pipeline.
//!
//! Two families of errors live here:
//!
//! - Conversion diagnostics, returned as data by [`crate::convert`]:
//!   [`RuleError`], [`CellError`], [`RowError`] and the aggregate
//!   [`Diagnostics`]
//! - Operational errors for the layers around the engine:
//!   [`LoadError`], [`RuleSetError`], [`OperationError`], [`GeneratorError`]
//!
//! Operational errors convert via `From` so `?` works across boundaries.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// Opaque failure cause returned by caller-supplied generators and converters.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// =============================================================================
// Rule Errors
// =============================================================================

/// What is structurally wrong with a rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleProblem {
    /// The rule has an empty `to_key`.
    #[error("no ToKey is specified")]
    MissingToKey,

    /// Another rule already writes to the same output field.
    #[error("duplicated ToKey[{to_key}] with rule index[{previous_index}]")]
    DuplicateToKey { to_key: String, previous_index: usize },

    /// The rule can never produce a value.
    #[error("at least one of Generator and FromKey should be specified")]
    NoSource,
}

/// A malformed rule, identified by its position in the rule list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("RuleIndex[{index}] : {problem}")]
pub struct RuleError {
    pub index: usize,
    pub problem: RuleProblem,
}

impl RuleError {
    pub fn new(index: usize, problem: RuleProblem) -> Self {
        Self { index, problem }
    }
}

// =============================================================================
// Cell Errors
// =============================================================================

/// Classification of a failed (record, rule) application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellErrorKind {
    /// A required source field is absent from the record.
    NoSourceValue,
    /// The rule's generator returned an error.
    GeneratorError,
    /// The rule's converter returned an error.
    ConverterError,
    /// The source value has no entry in the rule's mapping table.
    MappingError,
    /// The source value cannot be used as a mapping key (array or object).
    UnhashableValue,
}

impl CellErrorKind {
    /// Stable machine-readable tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            CellErrorKind::NoSourceValue => "no_source_value",
            CellErrorKind::GeneratorError => "generator_error",
            CellErrorKind::ConverterError => "converter_error",
            CellErrorKind::MappingError => "mapping_error",
            CellErrorKind::UnhashableValue => "unhashable_value",
        }
    }
}

impl fmt::Display for CellErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CellErrorKind::NoSourceValue => "no source value",
            CellErrorKind::GeneratorError => "generator error",
            CellErrorKind::ConverterError => "converter error",
            CellErrorKind::MappingError => "mapping error",
            CellErrorKind::UnhashableValue => "unhashable value",
        };
        f.write_str(label)
    }
}

/// Causes raised by the engine itself (as opposed to caller-supplied functions).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CellCause {
    #[error("required but not exists")]
    RequiredButMissing,

    #[error("not exists in mapping")]
    NotInMapping,

    #[error("{0} value cannot be used as a mapping key")]
    Unhashable(&'static str),
}

/// One failed rule application within one record.
#[derive(Debug)]
pub struct CellError {
    pub from_key: String,
    pub to_key: String,
    /// Raw source value, when the record had one.
    pub value: Option<Value>,
    pub kind: CellErrorKind,
    /// Underlying cause, kept exactly as produced.
    pub cause: BoxError,
}

impl CellError {
    pub fn new(
        from_key: impl Into<String>,
        to_key: impl Into<String>,
        value: Option<Value>,
        kind: CellErrorKind,
        cause: impl Into<BoxError>,
    ) -> Self {
        Self {
            from_key: from_key.into(),
            to_key: to_key.into(),
            value,
            kind,
            cause: cause.into(),
        }
    }
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match &self.value {
            Some(v) => v.to_string(),
            None => "<nil>".to_string(),
        };
        write!(
            f,
            "FromKey[{}],ToKey[{}],Value[{}],ErrorType[{}] : {}",
            self.from_key, self.to_key, value, self.kind, self.cause
        )
    }
}

impl std::error::Error for CellError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.cause.as_ref())
    }
}

// =============================================================================
// Row Errors
// =============================================================================

/// All cell errors of one record.
#[derive(Debug)]
pub struct RowError {
    pub index: usize,
    pub cell_errors: Vec<CellError>,
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for cell in &self.cell_errors {
            writeln!(f, "RowIndex[{}],{}", self.index, cell)?;
        }
        Ok(())
    }
}

impl std::error::Error for RowError {}

// =============================================================================
// Diagnostics
// =============================================================================

/// Everything that went wrong (or was blank) during one conversion.
///
/// Built fresh by every call to [`crate::convert`] and handed back by value.
#[derive(Debug, Default)]
pub struct Diagnostics {
    /// Number of records where every rule found its source field absent.
    pub blank_row_count: usize,
    /// Structural rule problems. Non-empty means no record was converted.
    pub rule_errors: Vec<RuleError>,
    /// Records that failed at least one rule, in input order.
    pub row_errors: Vec<RowError>,
}

impl Diagnostics {
    pub fn has_rule_errors(&self) -> bool {
        !self.rule_errors.is_empty()
    }

    pub fn has_row_errors(&self) -> bool {
        !self.row_errors.is_empty()
    }

    /// True for a fully clean conversion.
    pub fn is_empty(&self) -> bool {
        !self.has_rule_errors() && !self.has_row_errors() && self.blank_row_count == 0
    }

    /// Total number of cell errors across all rows.
    pub fn cell_error_count(&self) -> usize {
        self.row_errors.iter().map(|r| r.cell_errors.len()).sum()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CommonValidationErrors:")?;
        for rule_error in &self.rule_errors {
            writeln!(f, "{}", rule_error)?;
        }
        writeln!(f, "RowValidationErrors:")?;
        for row_error in &self.row_errors {
            writeln!(f, "{}", row_error)?;
        }
        writeln!(f, "BlankRowCount : {}", self.blank_row_count)
    }
}

impl std::error::Error for Diagnostics {}

// =============================================================================
// Record Loading Errors
// =============================================================================

/// Errors while loading input records.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed CSV content.
    #[error("Invalid CSV format: {0}")]
    Csv(#[from] csv::Error),

    /// Malformed JSON content.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Empty input.
    #[error("Input is empty")]
    EmptyFile,

    /// No headers found.
    #[error("No headers found in CSV")]
    NoHeaders,

    /// Two CSV columns share a name.
    #[error("Duplicate CSV header: {0}")]
    DuplicateHeader(String),

    /// A JSON entry is not an object.
    #[error("Entry {index} is not a JSON object")]
    NotAnObject { index: usize },

    /// The input format could not be determined.
    #[error("Unknown input format: {0}")]
    UnknownFormat(String),
}

// =============================================================================
// Operation / Generator Errors
// =============================================================================

/// Failure of a built-in converter operation.
#[derive(Debug, Error)]
pub enum OperationError {
    /// The operation needs a scalar and got something else.
    #[error("{operation} expects a string, number or boolean, got {found}")]
    NotScalar {
        operation: &'static str,
        found: &'static str,
    },

    /// Regex pattern does not compile.
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// No digits to build a number from.
    #[error("'{0}' contains no digits")]
    NoDigits(String),

    /// Text does not parse as a number.
    #[error("'{0}' is not a number")]
    NotANumber(String),

    /// No four-digit year in the text.
    #[error("no year found in '{0}'")]
    NoYear(String),

    /// Value is blank where content is expected.
    #[error("value is blank")]
    Blank,
}

/// Failure of a built-in generator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeneratorError {
    /// None of the source fields had usable content.
    #[error("all sources are empty: {}", .0.join(", "))]
    AllSourcesEmpty(Vec<String>),

    /// None of the source fields is present in the record.
    #[error("no source present: {}", .0.join(", "))]
    NoSourcePresent(Vec<String>),
}

// =============================================================================
// Rule Set Errors
// =============================================================================

/// Errors while reading or compiling a declarative rule set.
#[derive(Debug, Error)]
pub enum RuleSetError {
    /// JSON serialization/deserialization error.
    #[error("Rule set JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to read the rule set file.
    #[error("Failed to read rule set: {0}")]
    Io(#[from] std::io::Error),

    /// An operation of a rule cannot be compiled.
    #[error("Invalid operation for '{to_key}': {source}")]
    InvalidOperation {
        to_key: String,
        #[source]
        source: OperationError,
    },

    /// Operations and a mapping on the same rule; the mapping would never run.
    #[error("Rule '{to_key}' has both operations and a mapping")]
    OperationsWithMapping { to_key: String },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for record loading.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for rule set operations.
pub type RuleSetResult<T> = Result<T, RuleSetError>;
