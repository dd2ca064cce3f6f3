//! # rowmap - rule-driven record normalization
//!
//! rowmap converts loosely-typed records (field name to JSON value) into a
//! canonical shape, one output field per rule, and reports every failure as
//! data instead of stopping at the first one.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Records   │────▶│  Validator  │────▶│   Engine    │────▶│   Records   │
//! │ (CSV/JSON)  │     │ (rule set)  │     │ (per cell)  │     │+ Diagnostics│
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use rowmap::{convert, Record, Rule};
//! use serde_json::json;
//!
//! let rules = vec![
//!     Rule::new("name", "Name").required(),
//!     Rule::new("code", "Code").with_mapping([("A", json!(1)), ("B", json!(2))]),
//! ];
//! let record: Record = json!({"name": "Ann", "code": "B"}).as_object().cloned().unwrap();
//!
//! let (output, diagnostics) = convert(&[record], &rules);
//! assert_eq!(output[0]["Code"], json!(2));
//! assert!(diagnostics.is_empty());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Diagnostics and error types
//! - [`models`] - Record and mapping key types
//! - [`transform`] - Rules, validator, engine and declarative rule sets
//! - [`parser`] - CSV / JSON record loading
//! - [`report`] - Serializable conversion report

// Core modules
pub mod error;
pub mod models;

// Transformation
pub mod transform;

// Loading
pub mod parser;

// Reporting
pub mod report;

// =============================================================================
// Re-exports - Errors and diagnostics
// =============================================================================

pub use error::{
    BoxError,
    CellCause,
    CellError,
    CellErrorKind,
    Diagnostics,
    GeneratorError,
    LoadError,
    OperationError,
    RowError,
    RuleError,
    RuleProblem,
    RuleSetError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{Mapping, MappingKey, Record};

// =============================================================================
// Re-exports - Engine
// =============================================================================

pub use transform::{check_rules, convert, Converter, Generator, Rule, Supplier};

// =============================================================================
// Re-exports - Declarative rule sets
// =============================================================================

pub use transform::dsl::{
    example_rule_set,
    operations_description,
    GeneratorSpec,
    Operation,
    Pipeline,
    RuleSet,
    RuleSpec,
};

// =============================================================================
// Re-exports - Loading and reporting
// =============================================================================

pub use parser::{load_records, InputFormat, ParseResult};
pub use report::{ConversionReport, ReportStatus};
