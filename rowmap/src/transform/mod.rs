//! Transformation module.
//!
//! - Rule: per-field derivation rules
//! - Validator: structural checks on a rule set
//! - Engine: record conversion and diagnostics
//! - DSL: declarative rule sets compiled into rules

pub mod dsl;
pub mod engine;
pub mod rule;
pub mod validator;

pub use engine::convert;
pub use rule::{Converter, Generator, Rule, Supplier};
pub use validator::check_rules;
