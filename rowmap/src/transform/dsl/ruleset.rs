//! Rule set definition
//!
//! A rule set is the serializable form of a rule list. Each [`RuleSpec`] is
//! compiled into a [`Rule`] whose converter, generator and default are built
//! from the declarative fields.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BoxError, RuleSetError, RuleSetResult};
use crate::models::{MappingKey, Record};
use crate::transform::rule::Rule;

use super::generators::GeneratorSpec;
use super::operations::{Operation, Pipeline};

/// An ordered list of declarative rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSet {
    /// Version of the rule set format
    #[serde(default = "default_version")]
    pub version: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Rules, applied in order
    pub rules: Vec<RuleSpec>,
}

fn default_version() -> String {
    "1.0".to_string()
}

/// Declarative form of one [`Rule`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSpec {
    /// Source field name
    #[serde(default)]
    pub from_key: String,

    /// Output field name
    #[serde(default)]
    pub to_key: String,

    /// Whether the source field must be present
    #[serde(default)]
    pub required: bool,

    /// Value used when the optional source field is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Ordered operations, compiled into the rule's converter
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operations: Vec<Operation>,

    /// Lookup table keyed by the source text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping: Option<BTreeMap<String, Value>>,

    /// Whole-record generator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<GeneratorSpec>,
}

impl RuleSet {
    /// Create an empty rule set
    pub fn new() -> Self {
        Self {
            version: default_version(),
            description: String::new(),
            rules: Vec::new(),
        }
    }

    /// Parse a rule set from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Parse a rule set from JSON value
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value.clone())
    }

    /// Read a rule set from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> RuleSetResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&content)?)
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn push(mut self, rule: RuleSpec) -> Self {
        self.rules.push(rule);
        self
    }

    /// Compile every rule, in order.
    ///
    /// Operation parameters and the operations/mapping exclusion are checked
    /// here; structural problems (missing or duplicate `toKey`) are left to
    /// [`crate::check_rules`].
    pub fn compile(&self) -> RuleSetResult<Vec<Rule>> {
        self.rules.iter().map(RuleSpec::compile).collect()
    }

    /// All source fields referenced by the rule set, sorted and deduplicated
    pub fn source_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .rules
            .iter()
            .flat_map(|r| r.source_keys())
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    /// Output fields, in rule order
    pub fn target_keys(&self) -> Vec<String> {
        self.rules.iter().map(|r| r.to_key.clone()).collect()
    }

    /// Report required source fields that are missing from the input headers
    pub fn validate_headers(&self, headers: &[String]) -> Result<(), Vec<String>> {
        let missing: Vec<String> = self
            .rules
            .iter()
            .filter(|r| r.required && r.generator.is_none() && !r.from_key.is_empty())
            .map(|r| r.from_key.clone())
            .filter(|key| !headers.iter().any(|h| h == key))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(missing)
        }
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleSpec {
    /// Create a rule copying a source field
    pub fn from_source(from_key: &str, to_key: &str) -> Self {
        Self {
            from_key: from_key.to_string(),
            to_key: to_key.to_string(),
            ..Self::default()
        }
    }

    /// Create a rule computed by a generator
    pub fn from_generator(to_key: &str, generator: GeneratorSpec) -> Self {
        Self {
            to_key: to_key.to_string(),
            generator: Some(generator),
            ..Self::default()
        }
    }

    /// Add an operation to the chain
    pub fn with_operation(mut self, op: Operation) -> Self {
        self.operations.push(op);
        self
    }

    /// Set the default value
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_mapping(mut self, mapping: BTreeMap<String, Value>) -> Self {
        self.mapping = Some(mapping);
        self
    }

    /// Mark as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Source fields read by this rule
    pub fn source_keys(&self) -> Vec<String> {
        match &self.generator {
            Some(generator) => generator.sources().to_vec(),
            None if self.from_key.is_empty() => Vec::new(),
            None => vec![self.from_key.clone()],
        }
    }

    /// Build the runtime rule.
    ///
    /// A converter always wins over a mapping, so a spec carrying both is
    /// rejected.
    pub fn compile(&self) -> RuleSetResult<Rule> {
        if !self.operations.is_empty() && self.mapping.is_some() {
            return Err(RuleSetError::OperationsWithMapping {
                to_key: self.to_key.clone(),
            });
        }

        let pipeline = Pipeline::new(&self.operations).map_err(|source| {
            RuleSetError::InvalidOperation {
                to_key: self.to_key.clone(),
                source,
            }
        })?;

        let mut rule = Rule::new(self.from_key.as_str(), self.to_key.as_str());
        rule.required = self.required;

        if let Some(default) = &self.default {
            rule = rule.with_default_value(default.clone());
        }

        if !pipeline.is_empty() {
            rule.converter = Some(Arc::new(move |value: &Value| -> Result<Value, BoxError> {
                pipeline.apply(value).map_err(Into::into)
            }));
        }

        if let Some(mapping) = &self.mapping {
            rule.mapping = Some(
                mapping
                    .iter()
                    .map(|(k, v)| (MappingKey::from(k.as_str()), v.clone()))
                    .collect(),
            );
        }

        if let Some(generator) = &self.generator {
            let generator = generator.clone();
            rule.generator = Some(Arc::new(move |record: &Record| -> Result<Value, BoxError> {
                generator.generate(record).map_err(Into::into)
            }));
        }

        Ok(rule)
    }
}

/// Generate an example rule set for documentation
pub fn example_rule_set() -> RuleSet {
    let status_mapping: BTreeMap<String, Value> = [("A", true), ("I", false)]
        .into_iter()
        .map(|(k, v)| (k.to_string(), Value::Bool(v)))
        .collect();

    RuleSet {
        version: default_version(),
        description: "Example rule set normalizing customer rows".to_string(),
        rules: vec![
            RuleSpec::from_source("Customer ID", "customerId")
                .with_operation(Operation::Trim)
                .with_operation(Operation::Replace {
                    pattern: "[-. ]".to_string(),
                    value: String::new(),
                })
                .with_operation(Operation::EnsurePrefix { value: "C".to_string() })
                .required(),
            RuleSpec::from_source("Email", "email")
                .with_operation(Operation::Trim)
                .with_operation(Operation::Lowercase)
                .with_operation(Operation::NotEmpty)
                .required(),
            RuleSpec::from_generator(
                "fullName",
                GeneratorSpec::concat(&["First Name", "Last Name"], " "),
            ),
            RuleSpec::from_source("Status", "active")
                .with_mapping(status_mapping)
                .required(),
            RuleSpec::from_source("Age", "age").with_operation(Operation::ToNumber),
            RuleSpec::from_source("Newsletter", "newsletter")
                .with_operation(Operation::ToBoolean {
                    true_values: vec!["yes".into(), "y".into(), "1".into(), "x".into()],
                })
                .with_default(Value::Bool(false)),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::check_rules;
    use serde_json::json;

    #[test]
    fn test_rule_set_serialization() {
        let rule_set = example_rule_set();
        let json = rule_set.to_json().unwrap();
        let parsed = RuleSet::from_json(&json).unwrap();
        assert_eq!(parsed.version, rule_set.version);
        assert_eq!(parsed.rules, rule_set.rules);
    }

    #[test]
    fn test_parse_camel_case() {
        let rule_set = RuleSet::from_value(&json!({
            "rules": [
                {"fromKey": "age", "toKey": "Age", "default": 0,
                 "operations": [{"type": "to_number"}]},
                {"toKey": "Full", "generator": {"type": "concat", "sources": ["a", "b"]}}
            ]
        }))
        .unwrap();

        assert_eq!(rule_set.version, "1.0");
        assert_eq!(rule_set.rules[0].from_key, "age");
        assert_eq!(rule_set.rules[0].default, Some(json!(0)));
        assert_eq!(rule_set.rules[1].source_keys(), vec!["a", "b"]);
    }

    #[test]
    fn test_compile_builds_every_mode() {
        let rules = example_rule_set().compile().unwrap();
        assert_eq!(rules.len(), 6);
        assert!(rules[0].converter.is_some());
        assert!(rules[2].generator.is_some());
        assert!(rules[3].mapping.is_some());
        assert!(rules[5].default.is_some());
        assert!(check_rules(&rules).is_empty());
    }

    #[test]
    fn test_compile_rejects_bad_pattern() {
        let rule_set = RuleSet::new().push(
            RuleSpec::from_source("a", "A").with_operation(Operation::Replace {
                pattern: "[".into(),
                value: String::new(),
            }),
        );
        let err = rule_set.compile().unwrap_err();
        assert!(matches!(err, RuleSetError::InvalidOperation { ref to_key, .. } if to_key == "A"));
    }

    #[test]
    fn test_compile_rejects_operations_with_mapping() {
        let mapping: BTreeMap<String, Value> = [("CA".to_string(), json!("Canada"))].into();
        let rule_set = RuleSet::new().push(
            RuleSpec::from_source("country", "Country")
                .with_operation(Operation::Uppercase)
                .with_mapping(mapping.clone()),
        );
        let err = rule_set.compile().unwrap_err();
        assert!(matches!(
            err,
            RuleSetError::OperationsWithMapping { ref to_key } if to_key == "Country"
        ));

        let rules = RuleSet::new()
            .push(RuleSpec::from_source("country", "Country").with_mapping(mapping))
            .compile()
            .unwrap();
        let records: Vec<Record> = [json!({"country": "CA"}), json!({"country": "zz"})]
            .into_iter()
            .filter_map(|v| v.as_object().cloned())
            .collect();
        let (output, diagnostics) = crate::convert(&records, &rules);
        assert_eq!(output.len(), 1);
        assert_eq!(output[0]["Country"], json!("Canada"));
        assert_eq!(diagnostics.row_errors[0].index, 1);
    }

    #[test]
    fn test_compiled_converter_reuses_pattern() {
        let rules = RuleSet::new()
            .push(RuleSpec::from_source("phone", "Phone").with_operation(Operation::Replace {
                pattern: r"\D".into(),
                value: String::new(),
            }))
            .compile()
            .unwrap();
        let converter = rules[0].converter.as_ref().unwrap();
        assert_eq!(converter(&json!("555-0100")).unwrap(), json!("5550100"));
        assert_eq!(converter(&json!("(555) 0199")).unwrap(), json!("5550199"));
    }

    #[test]
    fn test_compile_keeps_structural_errors_for_validator() {
        let rule_set = RuleSet::new().push(RuleSpec::default());
        let rules = rule_set.compile().unwrap();
        assert_eq!(check_rules(&rules).len(), 2);
    }

    #[test]
    fn test_validate_headers() {
        let rule_set = example_rule_set();
        let headers: Vec<String> = ["Customer ID", "Email", "Status"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert!(rule_set.validate_headers(&headers).is_ok());

        let missing = rule_set.validate_headers(&["Email".to_string()]).unwrap_err();
        assert_eq!(missing, vec!["Customer ID", "Status"]);
    }

    #[test]
    fn test_source_keys() {
        let keys = example_rule_set().source_keys();
        assert!(keys.contains(&"First Name".to_string()));
        assert!(keys.contains(&"Age".to_string()));
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
    }
}
