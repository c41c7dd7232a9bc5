use serde::Deserialize;

use crate::model::{MatchResult, Record, RecordSet, Value};
use crate::validate::{ValidationRule, DEFAULT_SEVERITY};

pub const UNMATCHED_SOURCE_MARKER: &str = "(unmatched_source)";
pub const UNMATCHED_TARGET_MARKER: &str = "(unmatched_target)";

/// Fixed report columns after the key column. The source key may not reuse these names.
pub const REPORT_COLUMNS: [&str; 4] = ["field", "source_value", "target_value", "severity"];

/// Options for the rule-based discrepancy report.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportOptions {
    /// Also emit one row per unmatched record. Off by default: unmatched
    /// records have no counterpart to compare fields against.
    #[serde(default)]
    pub include_unmatched: bool,
    #[serde(default = "default_unmatched_severity")]
    pub unmatched_severity: String,
}

fn default_unmatched_severity() -> String {
    DEFAULT_SEVERITY.to_string()
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            include_unmatched: false,
            unmatched_severity: default_unmatched_severity(),
        }
    }
}

/// Evaluate every rule against every matched pair; one row per failure.
///
/// Rules are evaluated independently and in order. Row columns are
/// `<source_key>`, `field`, `source_value`, `target_value`, `severity`.
pub fn build_rule_report(
    matches: &MatchResult,
    rules: &[ValidationRule],
    source_key: &str,
    target_key: &str,
    options: &ReportOptions,
) -> RecordSet {
    let mut rows = Vec::new();

    for pair in &matches.matched_pairs {
        let key_value = pair.source.get(source_key);
        for rule in rules {
            if rule.check(&pair.source, &pair.target) {
                continue;
            }
            rows.push(report_row(
                source_key,
                key_value.clone(),
                &rule.field,
                pair.source.get(&rule.field).clone(),
                pair.target.get(rule.target_field()).clone(),
                &rule.severity,
            ));
        }
    }

    if options.include_unmatched {
        for record in &matches.unmatched_source {
            rows.push(report_row(
                source_key,
                record.get(source_key).clone(),
                UNMATCHED_SOURCE_MARKER,
                Value::Null,
                Value::Null,
                &options.unmatched_severity,
            ));
        }
        for record in &matches.unmatched_target {
            rows.push(report_row(
                source_key,
                record.get(target_key).clone(),
                UNMATCHED_TARGET_MARKER,
                Value::Null,
                Value::Null,
                &options.unmatched_severity,
            ));
        }
    }

    rows
}

fn report_row(
    key_column: &str,
    key_value: Value,
    field: &str,
    source_value: Value,
    target_value: Value,
    severity: &str,
) -> Record {
    let [field_col, source_col, target_col, severity_col] = REPORT_COLUMNS;
    Record::from_pairs([
        (key_column, key_value),
        (field_col, Value::from(field)),
        (source_col, source_value),
        (target_col, target_value),
        (severity_col, Value::from(severity)),
    ])
}
