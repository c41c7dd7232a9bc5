//! File-backed entry point. Format handling is injected through
//! [`RecordReader`] / [`RecordWriter`] so the engine stays IO-free.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::config::ReconConfig;
use crate::engine::run;
use crate::error::ReconError;
use crate::model::{Record, RecordSet, ReconResult};

pub trait RecordReader {
    /// Load every row of `path`. `sheet` selects a worksheet for spreadsheet formats.
    fn read(&self, path: &Path, sheet: Option<&str>) -> Result<RecordSet, ReconError>;
}

pub trait RecordWriter {
    /// Write `records` to `path`, creating parent directories. Must accept an
    /// empty slice. Returns the path actually written.
    fn write(&self, records: &[Record], path: &Path) -> Result<PathBuf, ReconError>;
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowOutput {
    /// Logical output name -> written file.
    pub files: BTreeMap<String, PathBuf>,
    pub result: ReconResult,
}

/// Read both sides, reconcile, write every output.
///
/// Relative paths in `config` resolve against `base_dir` (normally the
/// config file's directory).
pub fn run_workflow(
    config: &ReconConfig,
    base_dir: &Path,
    reader: &dyn RecordReader,
    writer: &dyn RecordWriter,
) -> Result<WorkflowOutput, ReconError> {
    config.validate()?;
    config.require_files()?;

    let source_path = base_dir.join(&config.source.file);
    let target_path = base_dir.join(&config.target.file);
    let source = reader.read(&source_path, config.source.sheet.as_deref())?;
    let target = reader.read(&target_path, config.target.sheet.as_deref())?;
    info!(
        source = %source_path.display(),
        target = %target_path.display(),
        source_rows = source.len(),
        target_rows = target.len(),
        "inputs loaded"
    );

    let result = run(config, &source, &target)?;

    let out_dir = base_dir.join(&config.output.dir);
    let mut targets: Vec<(String, String)> = config
        .builtin_outputs()
        .into_iter()
        .map(|(name, file)| (name.to_string(), file.to_string()))
        .collect();
    targets.extend(
        config
            .projections
            .iter()
            .map(|p| (p.name.clone(), p.file_name())),
    );

    let mut files = BTreeMap::new();
    for (name, file) in targets {
        let rows = result.outputs.get(&name).map(Vec::as_slice).unwrap_or(&[]);
        let written = writer.write(rows, &out_dir.join(file))?;
        info!(output = %name, rows = rows.len(), path = %written.display(), "output written");
        files.insert(name, written);
    }

    Ok(WorkflowOutput { files, result })
}
