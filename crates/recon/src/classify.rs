use tracing::trace;

use crate::model::{AmountSplit, MatchResult, Value};
use crate::validate::Tolerance;

pub const DIFFERENCE_FIELD: &str = "difference";
pub const VALIDATION_ERROR_FIELD: &str = "validation_error";
pub const INVALID_NUMERIC: &str = "invalid_numeric";

/// Split a match into reconciled / unreconciled on one numeric field.
///
/// Output rows are the merged pair (target fields overwrite source fields on
/// collision). Failing pairs carry `difference = source - target`; pairs with a
/// non-numeric or absent value carry `validation_error = invalid_numeric`.
/// Unmatched records from both sides are appended to `unreconciled` unchanged,
/// source side first.
pub fn classify_amounts(
    matches: &MatchResult,
    field: &str,
    target_field: Option<&str>,
    tolerance: &Tolerance,
) -> AmountSplit {
    let target_field = target_field.unwrap_or(field);
    let mut split = AmountSplit::default();

    for pair in &matches.matched_pairs {
        let merged = pair.source.merged_with(&pair.target);
        let v1 = pair.source.get(field).to_number();
        let v2 = pair.target.get(target_field).to_number();

        let (Some(v1), Some(v2)) = (v1, v2) else {
            trace!(
                source_index = pair.source_index,
                target_index = pair.target_index,
                "non-numeric {field}"
            );
            split.invalid_numeric += 1;
            split
                .unreconciled
                .push(merged.with_field(VALIDATION_ERROR_FIELD, INVALID_NUMERIC));
            continue;
        };

        if tolerance.accepts(v1, v2) {
            split.reconciled.push(merged);
        } else {
            split
                .unreconciled
                .push(merged.with_field(DIFFERENCE_FIELD, Value::Number(v1 - v2)));
        }
    }

    split
        .unreconciled
        .extend(matches.unmatched_source.iter().cloned());
    split
        .unreconciled
        .extend(matches.unmatched_target.iter().cloned());

    split
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::match_on_key;
    use crate::model::Record;

    fn inv(no: &str, amount: impl Into<Value>) -> Record {
        Record::from_pairs([("invoice_number", Value::from(no)), ("amount", amount.into())])
    }

    #[test]
    fn two_way_split_absolute() {
        let source = vec![inv("INV-001", 1000.0), inv("INV-002", 1500.0), inv("INV-003", 500.0)];
        let target = vec![inv("INV-001", 1000.0), inv("INV-002", 1501.0), inv("INV-004", 800.0)];
        let m = match_on_key(&source, &target, "invoice_number");
        let split = classify_amounts(&m, "amount", None, &Tolerance::Absolute(0.01));

        assert_eq!(split.reconciled.len(), 1);
        assert_eq!(split.reconciled[0].get("invoice_number").to_text(), "INV-001");
        assert!(!split.reconciled[0].contains(DIFFERENCE_FIELD));

        let keys: Vec<String> = split
            .unreconciled
            .iter()
            .map(|r| r.get("invoice_number").to_text())
            .collect();
        assert_eq!(keys, ["INV-002", "INV-003", "INV-004"]);
        assert_eq!(split.unreconciled[0].get(DIFFERENCE_FIELD), &Value::Number(-1.0));
        assert!(!split.unreconciled[1].contains(DIFFERENCE_FIELD));
        assert!(!split.unreconciled[2].contains(DIFFERENCE_FIELD));
        assert_eq!(split.invalid_numeric, 0);
    }

    #[test]
    fn distinct_target_field_and_percent() {
        let source = vec![
            Record::from_pairs([("sku_code", Value::from("A")), ("system_quantity", Value::from(100i64))]),
            Record::from_pairs([("sku_code", Value::from("B")), ("system_quantity", Value::from(50i64))]),
        ];
        let target = vec![
            Record::from_pairs([("sku", Value::from("A")), ("actual_quantity", Value::from(98i64))]),
            Record::from_pairs([("sku", Value::from("B")), ("actual_quantity", Value::from(45i64))]),
        ];
        let m = crate::matcher::match_by_key(&source, &target, "sku_code", "sku");
        let split = classify_amounts(
            &m,
            "system_quantity",
            Some("actual_quantity"),
            &Tolerance::Percent(2.0),
        );
        assert_eq!(split.reconciled.len(), 1);
        assert_eq!(split.unreconciled.len(), 1);
        let bad = &split.unreconciled[0];
        assert_eq!(bad.get("sku_code").to_text(), "B");
        assert_eq!(bad.get("sku").to_text(), "B");
        assert_eq!(bad.get(DIFFERENCE_FIELD), &Value::Number(5.0));
    }

    #[test]
    fn invalid_numeric_routed_unreconciled() {
        let source = vec![inv("INV-001", "abc"), inv("INV-002", Value::Null)];
        let target = vec![inv("INV-001", 10.0), inv("INV-002", 10.0)];
        let m = match_on_key(&source, &target, "invoice_number");
        let split = classify_amounts(&m, "amount", None, &Tolerance::default());

        assert!(split.reconciled.is_empty());
        assert_eq!(split.unreconciled.len(), 2);
        assert_eq!(split.invalid_numeric, 2);
        for row in &split.unreconciled {
            assert_eq!(row.get(VALIDATION_ERROR_FIELD).to_text(), INVALID_NUMERIC);
            assert!(!row.contains(DIFFERENCE_FIELD));
        }
    }

    #[test]
    fn absent_field_counts_as_invalid() {
        let source = vec![Record::from_pairs([("invoice_number", "INV-001")])];
        let target = vec![inv("INV-001", 10.0)];
        let m = match_on_key(&source, &target, "invoice_number");
        let split = classify_amounts(&m, "amount", None, &Tolerance::default());
        assert_eq!(split.invalid_numeric, 1);
    }

    #[test]
    fn merged_row_prefers_target_values() {
        let source = vec![Record::from_pairs([
            ("invoice_number", Value::from("INV-001")),
            ("amount", Value::from(10.0)),
            ("memo", Value::from("source")),
        ])];
        let target = vec![Record::from_pairs([
            ("invoice_number", Value::from("INV-001")),
            ("amount", Value::from(10.0)),
            ("memo", Value::from("target")),
        ])];
        let m = match_on_key(&source, &target, "invoice_number");
        let split = classify_amounts(&m, "amount", None, &Tolerance::default());
        assert_eq!(split.reconciled[0].get("memo").to_text(), "target");
    }

    #[test]
    fn every_input_row_accounted_for() {
        let source = vec![inv("A", 1.0), inv("B", 2.0), inv("C", 3.0)];
        let target = vec![inv("A", 1.0), inv("B", 9.0), inv("D", 4.0), inv("E", 5.0)];
        let m = match_on_key(&source, &target, "invoice_number");
        let split = classify_amounts(&m, "amount", None, &Tolerance::default());
        // 2 matched pairs + 1 unmatched source + 2 unmatched target
        assert_eq!(split.reconciled.len() + split.unreconciled.len(), 5);
    }
}
