//! Built-in converter operations.
//!
//! A rule's `operations` list is compiled into a single converter that runs the
//! operations in order and stops at the first failure.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::OperationError;
use crate::models::value_kind;

/// All available converter operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    /// Remove leading and trailing whitespace
    Trim,

    /// Convert to uppercase
    Uppercase,

    /// Convert to lowercase
    Lowercase,

    /// Replace using regex pattern
    Replace {
        pattern: String,
        #[serde(default)]
        value: String,
    },

    /// Pad string at start to reach target length
    PadStart {
        length: usize,
        #[serde(default = "default_pad_char")]
        char: String,
    },

    /// Pad string at end to reach target length
    PadEnd {
        length: usize,
        #[serde(default = "default_pad_char")]
        char: String,
    },

    /// Ensure string starts with given prefix
    EnsurePrefix { value: String },

    /// Ensure string ends with given suffix
    EnsureSuffix { value: String },

    /// Take a range of characters
    Substring {
        start: usize,
        #[serde(default)]
        length: Option<usize>,
    },

    /// Split string into array
    Split {
        #[serde(default = "default_split_separator")]
        separator: String,
    },

    /// Remove all non-digit characters
    DigitsOnly,

    /// Remove all non-alphanumeric characters
    Alphanumeric,

    /// Extract year (4 digits) from a date string
    ExtractYear,

    /// Convert to integer
    ToNumber,

    /// Convert to floating point number
    ToFloat,

    /// Convert to boolean
    ToBoolean {
        #[serde(default = "default_true_values")]
        true_values: Vec<String>,
    },

    /// Fail on blank strings
    NotEmpty,
}

static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}").expect("valid year pattern"));

static DECIMAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[-+]?(\d+\.\d*|\.\d+|\d+(\.\d*)?[eE][-+]?\d+)$")
        .expect("valid decimal pattern")
});

fn default_pad_char() -> String {
    "0".to_string()
}

fn default_split_separator() -> String {
    ",".to_string()
}

fn default_true_values() -> Vec<String> {
    ["true", "1", "yes", "y", "on", "x"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Operation {
    /// Name used in the JSON `type` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Trim => "trim",
            Operation::Uppercase => "uppercase",
            Operation::Lowercase => "lowercase",
            Operation::Replace { .. } => "replace",
            Operation::PadStart { .. } => "pad_start",
            Operation::PadEnd { .. } => "pad_end",
            Operation::EnsurePrefix { .. } => "ensure_prefix",
            Operation::EnsureSuffix { .. } => "ensure_suffix",
            Operation::Substring { .. } => "substring",
            Operation::Split { .. } => "split",
            Operation::DigitsOnly => "digits_only",
            Operation::Alphanumeric => "alphanumeric",
            Operation::ExtractYear => "extract_year",
            Operation::ToNumber => "to_number",
            Operation::ToFloat => "to_float",
            Operation::ToBoolean { .. } => "to_boolean",
            Operation::NotEmpty => "not_empty",
        }
    }

    /// Check parameters that can be rejected before any value is seen.
    pub fn validate(&self) -> Result<(), OperationError> {
        self.compile_pattern().map(|_| ())
    }

    fn compile_pattern(&self) -> Result<Option<Regex>, OperationError> {
        match self {
            Operation::Replace { pattern, .. } => Ok(Some(Regex::new(pattern)?)),
            _ => Ok(None),
        }
    }

    /// Apply this operation to a value.
    ///
    /// A `replace` pattern is compiled on every call; use [`Pipeline`] to
    /// compile it once for many values.
    pub fn apply(&self, value: &Value) -> Result<Value, OperationError> {
        let pattern = self.compile_pattern()?;
        self.apply_with(value, pattern.as_ref())
    }

    fn apply_with(&self, value: &Value, pattern: Option<&Regex>) -> Result<Value, OperationError> {
        match self {
            Operation::Trim => self.map_str(value, |s| s.trim().to_string()),
            Operation::Uppercase => self.map_str(value, |s| s.to_uppercase()),
            Operation::Lowercase => self.map_str(value, |s| s.to_lowercase()),
            Operation::Replace { pattern: source, value: replacement } => {
                let compiled;
                let re = match pattern {
                    Some(re) => re,
                    None => {
                        compiled = Regex::new(source)?;
                        &compiled
                    }
                };
                self.map_str(value, |s| re.replace_all(s, replacement.as_str()).into_owned())
            }
            Operation::PadStart { length, char } => {
                self.map_str(value, |s| pad(s, *length, char, true))
            }
            Operation::PadEnd { length, char } => {
                self.map_str(value, |s| pad(s, *length, char, false))
            }
            Operation::EnsurePrefix { value: prefix } => self.map_str(value, |s| {
                if s.starts_with(prefix.as_str()) {
                    s.to_string()
                } else {
                    format!("{}{}", prefix, s)
                }
            }),
            Operation::EnsureSuffix { value: suffix } => self.map_str(value, |s| {
                if s.ends_with(suffix.as_str()) {
                    s.to_string()
                } else {
                    format!("{}{}", s, suffix)
                }
            }),
            Operation::Substring { start, length } => self.map_str(value, |s| {
                let chars = s.chars().skip(*start);
                match length {
                    Some(l) => chars.take(*l).collect(),
                    None => chars.collect(),
                }
            }),
            Operation::Split { separator } => {
                let s = self.scalar_text(value)?;
                let parts = s
                    .split(separator.as_str())
                    .map(|p| Value::String(p.trim().to_string()))
                    .collect();
                Ok(Value::Array(parts))
            }
            Operation::DigitsOnly => {
                self.map_str(value, |s| s.chars().filter(|c| c.is_ascii_digit()).collect())
            }
            Operation::Alphanumeric => {
                self.map_str(value, |s| s.chars().filter(|c| c.is_alphanumeric()).collect())
            }
            Operation::ExtractYear => self.apply_extract_year(value),
            Operation::ToNumber => self.apply_to_number(value),
            Operation::ToFloat => self.apply_to_float(value),
            Operation::ToBoolean { true_values } => self.apply_to_boolean(value, true_values),
            Operation::NotEmpty => {
                let s = self.scalar_text(value)?;
                if s.trim().is_empty() {
                    Err(OperationError::Blank)
                } else {
                    Ok(value.clone())
                }
            }
        }
    }

    /// Text form of a scalar; containers and null are rejected.
    fn scalar_text(&self, value: &Value) -> Result<String, OperationError> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            _ => Err(OperationError::NotScalar {
                operation: self.name(),
                found: value_kind(value),
            }),
        }
    }

    fn map_str<F>(&self, value: &Value, f: F) -> Result<Value, OperationError>
    where
        F: FnOnce(&str) -> String,
    {
        let s = self.scalar_text(value)?;
        Ok(Value::String(f(&s)))
    }

    fn apply_extract_year(&self, value: &Value) -> Result<Value, OperationError> {
        let s = self.scalar_text(value)?;
        YEAR.find(&s)
            .and_then(|m| m.as_str().parse::<i64>().ok())
            .map(Value::from)
            .ok_or(OperationError::NoYear(s))
    }

    /// Integers pass through, floats are truncated toward zero. Strings keep
    /// their digits and a leading minus; decimal or exponent notation is an error.
    fn apply_to_number(&self, value: &Value) -> Result<Value, OperationError> {
        if let Value::Number(n) = value {
            if n.is_i64() || n.is_u64() {
                return Ok(value.clone());
            }
            return n
                .as_f64()
                .map(f64::trunc)
                .filter(|f| *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                .map(|f| Value::from(f as i64))
                .ok_or_else(|| OperationError::NotANumber(n.to_string()));
        }
        let s = self.scalar_text(value)?;
        if DECIMAL.is_match(s.trim()) {
            return Err(OperationError::NotANumber(s));
        }
        let is_negative = s.trim().starts_with('-');
        let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return Err(OperationError::NoDigits(s));
        }
        let text = if is_negative { format!("-{}", digits) } else { digits };
        text.parse::<i64>()
            .map(Value::from)
            .map_err(|_| OperationError::NotANumber(s))
    }

    fn apply_to_float(&self, value: &Value) -> Result<Value, OperationError> {
        if let Value::Number(_) = value {
            return Ok(value.clone());
        }
        let s = self.scalar_text(value)?;
        s.trim()
            .replace(',', ".")
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .ok_or(OperationError::NotANumber(s))
    }

    fn apply_to_boolean(
        &self,
        value: &Value,
        true_values: &[String],
    ) -> Result<Value, OperationError> {
        if let Value::Bool(b) = value {
            return Ok(Value::Bool(*b));
        }
        let lower = self.scalar_text(value)?.trim().to_lowercase();
        Ok(Value::Bool(true_values.iter().any(|tv| tv.to_lowercase() == lower)))
    }
}

fn pad(s: &str, length: usize, pad_char: &str, at_start: bool) -> String {
    let count = s.chars().count();
    if count >= length {
        return s.to_string();
    }
    let fill = pad_char.chars().next().unwrap_or('0');
    let padding: String = std::iter::repeat(fill).take(length - count).collect();
    if at_start {
        format!("{}{}", padding, s)
    } else {
        format!("{}{}", s, padding)
    }
}

/// A list of operations with their regex patterns compiled once.
#[derive(Debug, Clone)]
pub struct Pipeline {
    steps: Vec<(Operation, Option<Regex>)>,
}

impl Pipeline {
    /// Compile every operation; fails on the first invalid pattern.
    pub fn new(operations: &[Operation]) -> Result<Self, OperationError> {
        let steps = operations
            .iter()
            .map(|op| op.compile_pattern().map(|pattern| (op.clone(), pattern)))
            .collect::<Result<Vec<_>, OperationError>>()?;
        Ok(Self { steps })
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run the operations in order, stopping at the first failure.
    pub fn apply(&self, value: &Value) -> Result<Value, OperationError> {
        let mut current = value.clone();
        for (op, pattern) in &self.steps {
            current = op.apply_with(&current, pattern.as_ref())?;
        }
        Ok(current)
    }
}

/// Run operations in order, stopping at the first failure.
pub fn apply_all(operations: &[Operation], value: &Value) -> Result<Value, OperationError> {
    Pipeline::new(operations)?.apply(value)
}

/// Get a description of all available operations and generators
pub fn operations_description() -> String {
    r#"Available converter operations:

| Operation | Description | Parameters | Fails when |
|-----------|-------------|------------|------------|
| trim | Remove leading/trailing whitespace | - | value is not a scalar |
| uppercase | Convert to uppercase | - | value is not a scalar |
| lowercase | Convert to lowercase | - | value is not a scalar |
| replace | Regex pattern replacement | pattern: regex, value: replacement | pattern is invalid |
| pad_start | Pad string at start | length, char (default "0") | value is not a scalar |
| pad_end | Pad string at end | length, char (default "0") | value is not a scalar |
| ensure_prefix | Add prefix if not present | value: prefix | value is not a scalar |
| ensure_suffix | Add suffix if not present | value: suffix | value is not a scalar |
| substring | Extract characters | start, length (optional) | value is not a scalar |
| split | Split into array | separator (default ",") | value is not a scalar |
| digits_only | Keep only digits | - | value is not a scalar |
| alphanumeric | Keep only alphanumeric chars | - | value is not a scalar |
| extract_year | Extract 4-digit year | - | no year found |
| to_number | Convert to integer (floats truncated) | - | no digits, decimal text |
| to_float | Convert to decimal number | - | not a number |
| to_boolean | Convert to boolean | true_values: truthy strings | value is not a scalar |
| not_empty | Reject blank strings | - | value is blank |

Available generators:

| Generator | Description | Parameters | Fails when |
|-----------|-------------|------------|------------|
| concat | Join non-empty source fields | sources, separator (default " ") | all sources empty |
| coalesce | First present non-null source field | sources | none present |
| constant | Fixed value | value | never |

A rule uses either operations or a mapping, not both.

Example rules in JSON:
{
  "fromKey": "country",
  "toKey": "countryCode",
  "required": true,
  "operations": [{"type": "trim"}, {"type": "uppercase"}]
}
{
  "fromKey": "status",
  "toKey": "active",
  "mapping": {"A": true, "I": false}
}"#
    .to_string()
}
