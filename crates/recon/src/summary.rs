use crate::model::{AmountSplit, MatchResult, Record, ReconSummary};

/// Counts that hold for either mode.
pub fn summarize_match(
    source_records: usize,
    target_records: usize,
    matches: &MatchResult,
    stranded_duplicates: usize,
) -> ReconSummary {
    ReconSummary {
        source_records,
        target_records,
        matched: matches.matched_pairs.len(),
        unmatched_source: matches.unmatched_source.len(),
        unmatched_target: matches.unmatched_target.len(),
        stranded_duplicates,
        ..ReconSummary::default()
    }
}

pub fn add_amount_split(summary: &mut ReconSummary, split: &AmountSplit) {
    summary.reconciled = split.reconciled.len();
    summary.unreconciled = split.unreconciled.len();
    summary.invalid_numeric = split.invalid_numeric;
}

pub fn add_report(summary: &mut ReconSummary, report: &[Record]) {
    summary.report_rows = report.len();
    for row in report {
        *summary
            .severity_counts
            .entry(row.get("severity").to_text())
            .or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Value;

    #[test]
    fn severity_counts() {
        let report = vec![
            Record::from_pairs([("severity", Value::from("Warning"))]),
            Record::from_pairs([("severity", Value::from("Error"))]),
            Record::from_pairs([("severity", Value::from("Warning"))]),
        ];
        let mut summary = summarize_match(2, 2, &MatchResult::default(), 0);
        add_report(&mut summary, &report);
        assert_eq!(summary.report_rows, 3);
        assert_eq!(summary.severity_counts["Warning"], 2);
        assert_eq!(summary.severity_counts["Error"], 1);
        assert!(summary.has_discrepancies());
    }

    #[test]
    fn amount_counts() {
        let split = AmountSplit {
            reconciled: vec![Record::new()],
            unreconciled: vec![Record::new(), Record::new()],
            invalid_numeric: 1,
        };
        let mut summary = summarize_match(2, 2, &MatchResult::default(), 0);
        add_amount_split(&mut summary, &split);
        assert_eq!(summary.reconciled, 1);
        assert_eq!(summary.unreconciled, 2);
        assert_eq!(summary.invalid_numeric, 1);
        assert_eq!(summary.report_rows, 0);
    }

    #[test]
    fn clean_run_has_no_discrepancies() {
        let summary = summarize_match(0, 0, &MatchResult::default(), 0);
        assert!(!summary.has_discrepancies());
    }
}
