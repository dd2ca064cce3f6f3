//! Declarative rule sets.
//!
//! Rules carrying closures cannot be stored, so this module describes rules as
//! JSON and compiles them into [`crate::Rule`] values:
//! - `ruleset`: rule set definition and compilation
//! - `operations`: built-in converter steps
//! - `generators`: built-in whole-record generators
//!
//! ## Usage Flow
//!
//! ```text
//! rules.json → RuleSet::from_json → RuleSet::compile → convert(records, rules)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use rowmap::{convert, RuleSet};
//! use serde_json::json;
//!
//! let rule_set = RuleSet::from_value(&json!({
//!     "rules": [
//!         {"fromKey": "name", "toKey": "Name", "required": true},
//!         {"fromKey": "age", "toKey": "Age", "default": 0,
//!          "operations": [{"type": "to_number"}]}
//!     ]
//! }))
//! .unwrap();
//! let rules = rule_set.compile().unwrap();
//!
//! let record = json!({"name": "Ann", "age": "30"}).as_object().cloned().unwrap();
//! let (output, diagnostics) = convert(&[record], &rules);
//!
//! assert_eq!(output[0]["Age"], json!(30));
//! assert!(diagnostics.is_empty());
//! ```

pub mod generators;
pub mod operations;
pub mod ruleset;

pub use generators::GeneratorSpec;
pub use operations::{apply_all, operations_description, Operation, Pipeline};
pub use ruleset::{example_rule_set, RuleSet, RuleSpec};
