// CSV/TSV import/export

use std::io::Read;
use std::path::Path;

use matchbook_recon::model::{column_union, Record, RecordSet, Value};
use matchbook_recon::ReconError;
use tracing::debug;

use crate::header_names;

pub fn import(path: &Path) -> Result<RecordSet, ReconError> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    debug!(path = %path.display(), delimiter = %(delimiter as char).escape_default(), "csv delimiter");
    import_from_string(&content, delimiter).map_err(|e| ReconError::read(path, e))
}

pub fn import_tsv(path: &Path) -> Result<RecordSet, ReconError> {
    let content = read_file_as_utf8(path)?;
    import_from_string(&content, b'\t').map_err(|e| ReconError::read(path, e))
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // header line must split
        let target = counts[0];
        if target <= 1 {
            continue;
        }

        // ties go to the wider split
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, ReconError> {
    let mut file = std::fs::File::open(path).map_err(|e| ReconError::read(path, e))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| ReconError::read(path, e))?;

    let text = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            debug!(path = %path.display(), "not UTF-8; decoding as Windows-1252");
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    };
    Ok(text.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(text))
}

/// First row is the header. Blank lines are skipped; short rows read the
/// missing cells as Null and surplus cells are dropped.
pub fn import_from_string(content: &str, delimiter: u8) -> Result<RecordSet, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows = reader.records();
    let header = match rows.next() {
        Some(result) => result.map_err(|e| e.to_string())?,
        None => return Ok(Vec::new()),
    };
    let names = header_names(header.iter());

    let mut records = Vec::new();
    for result in rows {
        let row = result.map_err(|e| e.to_string())?;
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let record = Record::from_pairs(
            names
                .iter()
                .enumerate()
                .map(|(i, name)| (name.as_str(), row.get(i).map(Value::from_input).unwrap_or_default())),
        );
        records.push(record);
    }

    Ok(records)
}

pub fn export(records: &[Record], path: &Path) -> Result<(), ReconError> {
    export_with_delimiter(records, path, b',')
}

pub fn export_tsv(records: &[Record], path: &Path) -> Result<(), ReconError> {
    export_with_delimiter(records, path, b'\t')
}

/// An empty record set produces a zero-byte file with no header.
fn export_with_delimiter(records: &[Record], path: &Path, delimiter: u8) -> Result<(), ReconError> {
    if records.is_empty() {
        std::fs::write(path, b"").map_err(|e| ReconError::write(path, e))?;
        return Ok(());
    }

    let header = column_union(records);
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .map_err(|e| ReconError::write(path, e))?;

    writer.write_record(&header).map_err(|e| ReconError::write(path, e))?;
    for record in records {
        let row: Vec<String> = header.iter().map(|name| record.get(name).to_text()).collect();
        writer.write_record(&row).map_err(|e| ReconError::write(path, e))?;
    }

    writer.flush().map_err(|e| ReconError::write(path, e))?;
    debug!(path = %path.display(), rows = records.len(), columns = header.len(), "csv written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_sniff_semicolon_delimiter() {
        let content = "Name;Age;City\nAlice;30;Paris\nBob;25;London\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_sniff_comma_delimiter() {
        let content = "Name,Age,City\nAlice,30,Paris\nBob,25,London\n";
        assert_eq!(sniff_delimiter(content), b',');
    }

    #[test]
    fn test_sniff_tab_delimiter() {
        let content = "Name\tAge\tCity\nAlice\t30\tParis\nBob\t25\tLondon\n";
        assert_eq!(sniff_delimiter(content), b'\t');
    }

    #[test]
    fn test_sniff_pipe_delimiter() {
        let content = "Name|Age|City\nAlice|30|Paris\nBob|25|London\n";
        assert_eq!(sniff_delimiter(content), b'|');
    }

    #[test]
    fn test_sniff_semicolon_with_commas_in_values() {
        let content = "Name;Address;City\n\"Doe, Jane\";\"123 Main St, Apt 4\";Paris\nBob;\"456 Elm\";London\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_import_typed_cells() {
        let records = import_from_string("id,amount,memo\nINV-001, 1500.50 ,\n1002,abc,x\n", b',').unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("id"), &Value::Text("INV-001".into()));
        assert_eq!(records[0].get("amount"), &Value::Number(1500.5));
        assert!(records[0].get("memo").is_null());
        assert_eq!(records[1].get("id"), &Value::Number(1002.0));
        assert_eq!(records[1].get("amount"), &Value::Text("abc".into()));
    }

    #[test]
    fn test_non_finite_words_match_as_text_keys() {
        let source = import_from_string("sku,qty\nNAN,1\nINF,2\n", b',').unwrap();
        let target = import_from_string("sku,qty\nNAN,1\nINF,2\n", b',').unwrap();
        assert_eq!(source[0].get("sku"), &Value::Text("NAN".into()));
        assert_eq!(source[1].get("sku").to_text(), "INF");

        let m = matchbook_recon::matcher::match_on_key(&source, &target, "sku");
        assert_eq!(m.matched_pairs.len(), 2);
    }

    #[test]
    fn test_import_ragged_and_blank_rows() {
        let records = import_from_string("a,b,c\n1,2\n\n,,\n4,5,6,7\n", b',').unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].contains("c"));
        assert!(records[0].get("c").is_null());
        assert_eq!(records[1].len(), 3);
    }

    #[test]
    fn test_import_header_only_and_empty() {
        assert!(import_from_string("a,b\n", b',').unwrap().is_empty());
        assert!(import_from_string("", b',').unwrap().is_empty());
    }

    #[test]
    fn test_semicolon_csv_import() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.csv");
        fs::write(&path, "Name;Age;City\nAlice;30;Paris\nBob;25;London\n").unwrap();

        let records = import(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("Name").to_text(), "Alice");
        assert_eq!(records[0].get("Age"), &Value::Number(30.0));
        assert_eq!(records[1].get("City").to_text(), "London");
    }

    #[test]
    fn test_windows_1252_fallback() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin.csv");
        // "Café" with 0xE9
        fs::write(&path, b"name,qty\nCaf\xe9,3\n").unwrap();
        let records = import(&path).unwrap();
        assert_eq!(records[0].get("name").to_text(), "Café");
    }

    #[test]
    fn test_bom_stripped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bom.csv");
        fs::write(&path, "\u{feff}id,amount\nA,1\n").unwrap();
        let records = import(&path).unwrap();
        assert_eq!(records[0].get("id").to_text(), "A");
    }

    #[test]
    fn test_missing_file() {
        let err = import(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, ReconError::Read { .. }));
    }

    #[test]
    fn test_export_union_header_and_canonical_numbers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let records = vec![
            Record::from_pairs([("id", Value::from("A")), ("amount", Value::from(1000.0))]),
            Record::from_pairs([("id", Value::from("B")), ("difference", Value::from(-1.5))]),
        ];
        export(&records, &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "id,amount,difference\nA,1000,\nB,,-1.5\n");
    }

    #[test]
    fn test_export_empty_is_zero_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        export(&[], &path).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn test_tsv_export_then_import() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.tsv");
        let records = vec![
            Record::from_pairs([("Name", Value::from("Alice, Jr")), ("Value", Value::from(42i64))]),
            Record::from_pairs([("Name", Value::from("Bob")), ("Value", Value::from(17i64))]),
        ];
        export_tsv(&records, &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Name\tValue\n"));

        let imported = import_tsv(&path).unwrap();
        assert_eq!(imported, records);
    }
}
