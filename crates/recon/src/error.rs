use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors for a reconciliation invocation.
///
/// Data-quality problems inside records (non-numeric amounts, missing fields)
/// are never surfaced here; they are classified into the outputs instead.
#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (empty key, both modes set, bad projection, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// A required input (file reference or key name) was not supplied.
    #[error("missing required input: {0}")]
    MissingInput(String),
    /// No reader/writer exists for the file extension.
    #[error("unsupported file format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("cannot read {}: {message}", path.display())]
    Read { path: PathBuf, message: String },
    #[error("cannot write {}: {message}", path.display())]
    Write { path: PathBuf, message: String },
}

impl ReconError {
    pub fn read(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Read { path: path.into(), message: message.to_string() }
    }

    pub fn write(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Write { path: path.into(), message: message.to_string() }
    }
}
