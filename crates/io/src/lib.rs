// File I/O adapters for the reconciliation engine

use std::path::{Path, PathBuf};

use matchbook_recon::model::{Record, RecordSet};
use matchbook_recon::workflow::{RecordReader, RecordWriter};
use matchbook_recon::ReconError;

pub mod csv;
pub mod json;
pub mod xlsx;

/// Formats known to the adapters, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Delimiter sniffed on read, comma on write.
    Csv,
    Tsv,
    /// xlsx/xlsm/xls/xlsb/ods. Only xlsx is written.
    Excel,
    Json,
}

impl FileFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(Self::Csv),
            "tsv" | "tab" => Some(Self::Tsv),
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Some(Self::Excel),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Reads CSV/TSV and spreadsheet inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileReader;

impl RecordReader for FileReader {
    fn read(&self, path: &Path, sheet: Option<&str>) -> Result<RecordSet, ReconError> {
        match FileFormat::from_path(path) {
            Some(FileFormat::Csv) => csv::import(path),
            Some(FileFormat::Tsv) => csv::import_tsv(path),
            Some(FileFormat::Excel) => xlsx::import(path, sheet),
            Some(FileFormat::Json) | None => Err(ReconError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// Writes CSV/TSV, xlsx and JSON outputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileWriter;

impl RecordWriter for FileWriter {
    fn write(&self, records: &[Record], path: &Path) -> Result<PathBuf, ReconError> {
        let format = FileFormat::from_path(path)
            .ok_or_else(|| ReconError::UnsupportedFormat(path.to_path_buf()))?;
        let is_xlsx = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("xlsx"));
        if format == FileFormat::Excel && !is_xlsx {
            return Err(ReconError::UnsupportedFormat(path.to_path_buf()));
        }

        ensure_parent(path)?;
        match format {
            FileFormat::Csv => csv::export(records, path)?,
            FileFormat::Tsv => csv::export_tsv(records, path)?,
            FileFormat::Excel => xlsx::export(records, path)?,
            FileFormat::Json => json::export(records, path)?,
        }
        Ok(path.to_path_buf())
    }
}

fn ensure_parent(path: &Path) -> Result<(), ReconError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            std::fs::create_dir_all(dir).map_err(|e| ReconError::write(path, e))
        }
        _ => Ok(()),
    }
}

/// Header cells -> field names. Blank headers become `column_N` (1-based) and
/// repeats get a `.1`, `.2`, ... suffix so no column is silently dropped.
pub(crate) fn header_names<'a>(cells: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for (i, cell) in cells.into_iter().enumerate() {
        let base = match cell.trim() {
            "" => format!("column_{}", i + 1),
            name => name.to_string(),
        };
        let mut name = base.clone();
        let mut n = 1;
        while names.contains(&name) {
            name = format!("{base}.{n}");
            n += 1;
        }
        names.push(name);
    }
    names
}
