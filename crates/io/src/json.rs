// JSON export

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use matchbook_recon::model::Record;
use matchbook_recon::ReconError;

/// Export records as a JSON array of objects, keys in field order.
pub fn export(records: &[Record], path: &Path) -> Result<(), ReconError> {
    let file = File::create(path).map_err(|e| ReconError::write(path, e))?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, records).map_err(|e| ReconError::write(path, e))?;
    writer.write_all(b"\n").map_err(|e| ReconError::write(path, e))?;
    writer.flush().map_err(|e| ReconError::write(path, e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use matchbook_recon::model::Value;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_json_export() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.json");

        let records = vec![
            Record::from_pairs([("name", Value::from("Alice")), ("value", Value::from(42i64))]),
            Record::from_pairs([("name", Value::from("Bob")), ("value", Value::Null)]),
        ];
        export(&records, &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed[0]["name"], "Alice");
        assert_eq!(parsed[0]["value"], 42.0);
        assert!(parsed[1]["value"].is_null());
        assert!(content.find("\"name\"").unwrap() < content.find("\"value\"").unwrap());
    }

    #[test]
    fn test_json_export_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.json");
        export(&[], &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap().trim(), "[]");
    }
}
