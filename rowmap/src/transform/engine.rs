//! Conversion engine.
//!
//! Applies a validated rule set to every record and collects diagnostics.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{CellCause, CellError, CellErrorKind, Diagnostics, RowError};
use crate::models::{MappingKey, Record};

use super::rule::Rule;
use super::validator::check_rules;

/// Convert records according to the rules.
///
/// - No records or no rules: the input comes back unchanged with empty
///   diagnostics.
/// - Any structural rule problem: nothing is converted, the diagnostics hold
///   only the rule errors.
/// - Otherwise every record is converted. Records with at least one cell error
///   are left out of the output and reported as row errors; the others keep
///   their input order.
///
/// # Example
///
/// ```
/// use rowmap::{convert, Record, Rule};
/// use serde_json::{json, Value};
///
/// let rules = vec![
///     Rule::new("name", "Name").required(),
///     Rule::new("age", "Age").with_default_value(json!(0)),
/// ];
/// let records: Vec<Record> = vec![
///     json!({"name": "Ann", "age": 30}),
///     json!({"name": "Bob"}),
/// ]
/// .into_iter()
/// .filter_map(|v| match v {
///     Value::Object(map) => Some(map),
///     _ => None,
/// })
/// .collect();
///
/// let (output, diagnostics) = convert(&records, &rules);
/// assert_eq!(output.len(), 2);
/// assert_eq!(output[1]["Age"], json!(0));
/// assert!(!diagnostics.has_row_errors());
/// ```
pub fn convert(records: &[Record], rules: &[Rule]) -> (Vec<Record>, Diagnostics) {
    if records.is_empty() || rules.is_empty() {
        debug!(
            records = records.len(),
            rules = rules.len(),
            "nothing to convert, passing records through"
        );
        return (records.to_vec(), Diagnostics::default());
    }

    let rule_errors = check_rules(rules);
    if !rule_errors.is_empty() {
        warn!(
            rule_errors = rule_errors.len(),
            "rule set is malformed, conversion skipped"
        );
        return (
            Vec::new(),
            Diagnostics {
                rule_errors,
                ..Diagnostics::default()
            },
        );
    }

    let mut diagnostics = Diagnostics::default();
    let mut output = Vec::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        let row = convert_row(record, rules);

        if row.blank_cells == rules.len() {
            diagnostics.blank_row_count += 1;
        }

        if row.cell_errors.is_empty() {
            output.push(row.record);
        } else {
            diagnostics.row_errors.push(RowError {
                index,
                cell_errors: row.cell_errors,
            });
        }
    }

    debug!(
        input = records.len(),
        converted = output.len(),
        failed_rows = diagnostics.row_errors.len(),
        blank_rows = diagnostics.blank_row_count,
        "conversion finished"
    );

    (output, diagnostics)
}

/// Outcome of applying every rule to one record.
struct RowOutcome {
    record: Record,
    cell_errors: Vec<CellError>,
    /// Rules whose source field was absent.
    blank_cells: usize,
}

/// Outcome of applying one rule to one record.
enum Cell {
    Value(Value),
    /// Source absent, default applied.
    Defaulted(Value),
    /// Source absent but required.
    Missing(CellError),
    Failed(CellError),
}

fn convert_row(record: &Record, rules: &[Rule]) -> RowOutcome {
    let mut row = RowOutcome {
        record: Record::new(),
        cell_errors: Vec::new(),
        blank_cells: 0,
    };

    for rule in rules {
        match derive_cell(record, rule) {
            Cell::Value(value) => {
                row.record.insert(rule.to_key.clone(), value);
            }
            Cell::Defaulted(value) => {
                row.record.insert(rule.to_key.clone(), value);
                row.blank_cells += 1;
            }
            Cell::Missing(error) => {
                row.cell_errors.push(error);
                row.blank_cells += 1;
            }
            Cell::Failed(error) => row.cell_errors.push(error),
        }
    }

    row
}

fn derive_cell(record: &Record, rule: &Rule) -> Cell {
    if let Some(generator) = &rule.generator {
        return match generator(record) {
            Ok(value) => Cell::Value(value),
            Err(cause) => Cell::Failed(CellError::new(
                &rule.from_key,
                &rule.to_key,
                None,
                CellErrorKind::GeneratorError,
                cause,
            )),
        };
    }

    let source = match record.get(&rule.from_key) {
        Some(value) => value,
        None if rule.required => {
            return Cell::Missing(CellError::new(
                &rule.from_key,
                &rule.to_key,
                None,
                CellErrorKind::NoSourceValue,
                CellCause::RequiredButMissing,
            ));
        }
        None => return Cell::Defaulted(rule.default_value()),
    };

    if let Some(converter) = &rule.converter {
        return match converter(source) {
            Ok(value) => Cell::Value(value),
            Err(cause) => Cell::Failed(CellError::new(
                &rule.from_key,
                &rule.to_key,
                Some(source.clone()),
                CellErrorKind::ConverterError,
                cause,
            )),
        };
    }

    if let Some(mapping) = &rule.mapping {
        let key = match MappingKey::from_value(source) {
            Ok(key) => key,
            Err(kind) => {
                return Cell::Failed(CellError::new(
                    &rule.from_key,
                    &rule.to_key,
                    Some(source.clone()),
                    CellErrorKind::UnhashableValue,
                    CellCause::Unhashable(kind),
                ));
            }
        };
        return match mapping.get(&key) {
            Some(mapped) => Cell::Value(mapped.clone()),
            None => Cell::Failed(CellError::new(
                &rule.from_key,
                &rule.to_key,
                Some(source.clone()),
                CellErrorKind::MappingError,
                CellCause::NotInMapping,
            )),
        };
    }

    Cell::Value(source.clone())
}
