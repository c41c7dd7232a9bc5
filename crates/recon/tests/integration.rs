use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use matchbook_recon::config::ReconConfig;
use matchbook_recon::model::{Record, RecordSet, ReconMode, Value};
use matchbook_recon::workflow::{run_workflow, RecordReader, RecordWriter, WorkflowOutput};
use matchbook_recon::ReconError;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// Plain comma-separated fixtures: no quoting, header on the first line.
struct FixtureReader;

impl RecordReader for FixtureReader {
    fn read(&self, path: &Path, _sheet: Option<&str>) -> Result<RecordSet, ReconError> {
        let text = std::fs::read_to_string(path).map_err(|e| ReconError::read(path, e))?;
        let mut lines = text.lines();
        let header: Vec<&str> = lines.next().unwrap_or_default().split(',').collect();
        Ok(lines
            .filter(|l| !l.is_empty())
            .map(|line| {
                Record::from_pairs(
                    header
                        .iter()
                        .zip(line.split(','))
                        .map(|(name, cell)| (*name, Value::from_input(cell))),
                )
            })
            .collect())
    }
}

#[derive(Default)]
struct CapturingWriter(RefCell<BTreeMap<PathBuf, RecordSet>>);

impl RecordWriter for CapturingWriter {
    fn write(&self, records: &[Record], path: &Path) -> Result<PathBuf, ReconError> {
        self.0.borrow_mut().insert(path.to_path_buf(), records.to_vec());
        Ok(path.to_path_buf())
    }
}

fn load_and_run(config_file: &str) -> (WorkflowOutput, CapturingWriter) {
    let dir = fixtures_dir();
    let text = std::fs::read_to_string(dir.join(config_file)).unwrap();
    let config = ReconConfig::from_toml(&text).unwrap();
    let writer = CapturingWriter::default();
    let out = run_workflow(&config, &dir, &FixtureReader, &writer).unwrap();
    (out, writer)
}

fn key_of(row: &Record, fields: &[&str]) -> String {
    fields
        .iter()
        .map(|f| row.get(f))
        .find(|v| !v.is_null())
        .map(Value::to_text)
        .unwrap_or_default()
}

// -------------------------------------------------------------------------
// Amount mode
// -------------------------------------------------------------------------

#[test]
fn receivables_amount_split() {
    let (out, writer) = load_and_run("receivables.recon.toml");
    let result = &out.result;

    assert_eq!(result.meta.config_name, "Receivables Fixture");
    assert_eq!(result.meta.mode, ReconMode::Amount);

    let reconciled = &result.outputs["reconciled"];
    assert_eq!(reconciled.len(), 1);
    assert_eq!(reconciled[0].get("receipt_no").to_text(), "INV-001");
    // merged row carries both sides, target wins on `amount`
    assert_eq!(reconciled[0].get("customer").to_text(), "Acme Corp");
    assert_eq!(reconciled[0].get("payer").to_text(), "Acme");

    let unreconciled = &result.outputs["unreconciled"];
    let keys: Vec<String> = unreconciled
        .iter()
        .map(|r| key_of(r, &["receipt_no", "invoice_number"]))
        .collect();
    assert_eq!(keys, ["INV-002", "INV-005", "INV-003", "INV-004"]);
    assert_eq!(unreconciled[0].get("difference"), &Value::Number(-1.0));
    assert_eq!(unreconciled[1].get("validation_error").to_text(), "invalid_numeric");
    assert!(!unreconciled[2].contains("difference"));
    assert!(!unreconciled[3].contains("receipt_no"));

    let s = &result.summary;
    assert_eq!((s.matched, s.unmatched_source, s.unmatched_target), (3, 1, 1));
    assert_eq!((s.reconciled, s.unreconciled, s.invalid_numeric), (1, 4, 1));

    let out_dir = fixtures_dir().join("output");
    assert_eq!(out.files["reconciled"], out_dir.join("reconciled.csv"));
    assert_eq!(out.files["unreconciled"], out_dir.join("unreconciled.csv"));
    assert_eq!(writer.0.borrow().len(), 2);
}

#[test]
fn inventory_percent_with_projection() {
    let (out, writer) = load_and_run("inventory.recon.toml");
    let result = &out.result;

    assert_eq!(result.summary.reconciled, 1);
    assert_eq!(result.summary.unreconciled, 3);

    let report = &result.outputs["discrepancy_report"];
    assert_eq!(report.len(), 3);
    let columns: Vec<&str> = report[0].field_names().collect();
    assert_eq!(
        columns,
        ["sku_code", "product_name", "system_quantity", "actual_quantity", "difference"]
    );

    assert_eq!(report[0].get("sku_code").to_text(), "SKU-B02");
    assert_eq!(report[0].get("difference"), &Value::Number(5.0));
    assert_eq!(report[1].get("sku_code").to_text(), "SKU-D04");
    assert!(report[1].get("actual_quantity").is_null());
    assert_eq!(report[2].get("sku_code").to_text(), "SKU-C03");
    assert_eq!(report[2].get("product_name").to_text(), "Gadget");

    let path = fixtures_dir().join("output/discrepancy_report.csv");
    assert_eq!(out.files["discrepancy_report"], path);
    assert_eq!(writer.0.borrow()[&path].len(), 3);
}

// -------------------------------------------------------------------------
// Rules mode
// -------------------------------------------------------------------------

#[test]
fn hr_rule_report() {
    let (out, _) = load_and_run("hr.recon.toml");
    let result = &out.result;

    assert_eq!(result.meta.mode, ReconMode::Rules);
    assert_eq!(out.files.keys().collect::<Vec<_>>(), ["report"]);
    assert_eq!(
        out.files["report"],
        fixtures_dir().join("output/inconsistent_hr_data.csv")
    );

    let report = &result.outputs["report"];
    assert_eq!(report.len(), 2);
    assert_eq!(report[0].get("employee_id").to_text(), "1001");
    assert_eq!(report[0].get("field").to_text(), "department_code");
    assert_eq!(report[0].get("severity").to_text(), "Warning");
    assert_eq!(report[1].get("field").to_text(), "title_code");
    assert_eq!(report[1].get("target_value").to_text(), "T05");

    assert_eq!(result.summary.unmatched_source, 1);
    assert_eq!(result.summary.unmatched_target, 1);
    assert_eq!(result.summary.severity_counts.len(), 2);
}

#[test]
fn hr_rule_report_with_unmatched() {
    let dir = fixtures_dir();
    let text = std::fs::read_to_string(dir.join("hr.recon.toml")).unwrap();
    let text = format!("{text}\n[report]\ninclude_unmatched = true\nunmatched_severity = \"Info\"\n");
    let config = ReconConfig::from_toml(&text).unwrap();
    let out = run_workflow(&config, &dir, &FixtureReader, &CapturingWriter::default()).unwrap();

    let report = &out.result.outputs["report"];
    assert_eq!(report.len(), 4);
    assert_eq!(report[2].get("employee_id").to_text(), "1003");
    assert_eq!(report[2].get("field").to_text(), "(unmatched_source)");
    assert_eq!(report[3].get("employee_id").to_text(), "1004");
    assert_eq!(report[3].get("field").to_text(), "(unmatched_target)");
    assert_eq!(out.result.summary.severity_counts["Info"], 2);
}

// -------------------------------------------------------------------------
// Errors
// -------------------------------------------------------------------------

#[test]
fn missing_input_file_is_read_error() {
    let dir = fixtures_dir();
    let text = std::fs::read_to_string(dir.join("receivables.recon.toml"))
        .unwrap()
        .replace("billing.csv", "no_such_file.csv");
    let config = ReconConfig::from_toml(&text).unwrap();
    let err = run_workflow(&config, &dir, &FixtureReader, &CapturingWriter::default()).unwrap_err();
    match err {
        ReconError::Read { path, .. } => assert!(path.ends_with("no_such_file.csv")),
        other => panic!("expected Read, got {other:?}"),
    }
}

#[test]
fn result_serializes_to_json() {
    let (out, _) = load_and_run("receivables.recon.toml");
    let json = serde_json::to_value(&out).unwrap();
    assert_eq!(json["result"]["meta"]["mode"], "amount");
    assert_eq!(json["result"]["summary"]["reconciled"], 1);
    assert_eq!(json["result"]["outputs"]["reconciled"][0]["receipt_no"], "INV-001");
    assert_eq!(json["result"]["outputs"]["reconciled"][0]["amount"], 1000.0);
}
