// Excel import (xlsx, xls, xlsb, ods) and export (xlsx only)
//
// Import reads one worksheet with its first row as the header.
// Export writes a single sheet: header row, then one row per record.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::NaiveTime;
use matchbook_recon::model::{column_union, Record, RecordSet, Value};
use matchbook_recon::ReconError;
use rust_xlsxwriter::{Format, Workbook};
use tracing::debug;

use crate::header_names;

/// Read `sheet` (or the first sheet) of a workbook.
pub fn import(path: &Path, sheet: Option<&str>) -> Result<RecordSet, ReconError> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| ReconError::read(path, format!("failed to open workbook: {e}")))?;

    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ReconError::read(path, "workbook contains no sheets"))?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| ReconError::read(path, format!("failed to read sheet '{sheet_name}': {e}")))?;

    let mut rows = range.rows();
    let header_cells: Vec<String> = match rows.next() {
        Some(row) => row.iter().map(|c| cell_to_value(c).to_text()).collect(),
        None => return Ok(Vec::new()),
    };
    let names = header_names(header_cells.iter().map(String::as_str));

    let mut records = Vec::new();
    for row in rows {
        if row.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }
        records.push(Record::from_pairs(names.iter().enumerate().map(|(i, name)| {
            (name.as_str(), row.get(i).map(cell_to_value).unwrap_or_default())
        })));
    }

    debug!(path = %path.display(), sheet = %sheet_name, rows = records.len(), "workbook read");
    Ok(records)
}

fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) => Value::from_input(s),
        Data::Float(n) => Value::Number(*n),
        Data::Int(n) => Value::Number(*n as f64),
        Data::Bool(b) => Value::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::Error(e) => Value::Text(format!("#{e:?}")),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(dt) if dt.time() == NaiveTime::MIN => Value::Text(dt.format("%Y-%m-%d").to_string()),
            Some(dt) => Value::Text(dt.format("%Y-%m-%dT%H:%M:%S").to_string()),
            // durations and out-of-range serials stay numeric
            None => Value::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::Text(s.clone()),
    }
}

/// Numbers are written as numbers, text as strings, Null as a blank cell.
/// An empty record set produces a workbook with one empty sheet.
pub fn export(records: &[Record], path: &Path) -> Result<(), ReconError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let header_format = Format::new().set_bold();

    let header = column_union(records);
    for (col, name) in header.iter().enumerate() {
        let col = column_index(col, path)?;
        worksheet
            .write_string_with_format(0, col, name, &header_format)
            .map_err(|e| ReconError::write(path, e))?;
    }

    for (i, record) in records.iter().enumerate() {
        let row = u32::try_from(i + 1).map_err(|_| ReconError::write(path, "too many rows for xlsx"))?;
        for (col, name) in header.iter().enumerate() {
            let col = column_index(col, path)?;
            match record.get(name) {
                Value::Null => {}
                Value::Number(n) => {
                    worksheet.write_number(row, col, *n).map_err(|e| ReconError::write(path, e))?;
                }
                Value::Text(s) => {
                    worksheet.write_string(row, col, s).map_err(|e| ReconError::write(path, e))?;
                }
            }
        }
    }

    workbook
        .save(path)
        .map_err(|e| ReconError::write(path, format!("failed to save xlsx: {e}")))?;
    debug!(path = %path.display(), rows = records.len(), columns = header.len(), "xlsx written");
    Ok(())
}

fn column_index(col: usize, path: &Path) -> Result<u16, ReconError> {
    u16::try_from(col).map_err(|_| ReconError::write(path, "too many columns for xlsx"))
}
