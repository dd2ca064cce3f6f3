//! Serializable summary of a conversion, for files and tooling.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Diagnostics;

/// Overall outcome of a conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    /// Every record converted
    Ok,
    /// Some records failed or were blank
    Warning,
    /// The rule set was rejected
    Error,
}

/// Summary of one conversion
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionReport {
    pub status: ReportStatus,
    pub input_rows: usize,
    pub output_rows: usize,
    pub blank_rows: usize,
    pub rule_errors: Vec<RuleIssue>,
    pub cell_errors: Vec<CellIssue>,
}

/// A rejected rule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleIssue {
    pub rule_index: usize,
    pub message: String,
}

/// A failed cell, flattened with its row index
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellIssue {
    pub row_index: usize,
    pub from_key: String,
    pub to_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    pub kind: String,
    pub message: String,
}

impl ConversionReport {
    pub fn new(input_rows: usize, output_rows: usize, diagnostics: &Diagnostics) -> Self {
        let status = if diagnostics.has_rule_errors() {
            ReportStatus::Error
        } else if diagnostics.is_empty() {
            ReportStatus::Ok
        } else {
            ReportStatus::Warning
        };

        let rule_errors = diagnostics
            .rule_errors
            .iter()
            .map(|e| RuleIssue {
                rule_index: e.index,
                message: e.problem.to_string(),
            })
            .collect();

        let cell_errors = diagnostics
            .row_errors
            .iter()
            .flat_map(|row| {
                row.cell_errors.iter().map(move |cell| CellIssue {
                    row_index: row.index,
                    from_key: cell.from_key.clone(),
                    to_key: cell.to_key.clone(),
                    value: cell.value.clone(),
                    kind: cell.kind.as_str().to_string(),
                    message: cell.cause.to_string(),
                })
            })
            .collect();

        Self {
            status,
            input_rows,
            output_rows,
            blank_rows: diagnostics.blank_row_count,
            rule_errors,
            cell_errors,
        }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Number of distinct rows with at least one cell error
    pub fn failed_rows(&self) -> usize {
        let mut rows: Vec<usize> = self.cell_errors.iter().map(|c| c.row_index).collect();
        rows.dedup();
        rows.len()
    }

    /// Summary statistics, one line
    pub fn summary(&self) -> String {
        format!(
            "Converted: {}/{} rows, {} failed, {} blank, {} rule errors",
            self.output_rows,
            self.input_rows,
            self.failed_rows(),
            self.blank_rows,
            self.rule_errors.len()
        )
    }
}
