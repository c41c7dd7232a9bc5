//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! | Code | Meaning                                                  |
//! |------|----------------------------------------------------------|
//! | 0    | Success                                                  |
//! | 1    | Discrepancies found (only with `--strict`)               |
//! | 2    | Usage error (bad arguments, unknown preset)              |
//! | 3    | Invalid config (parse, validation, missing input)        |
//! | 4    | Runtime error (read/write failure, unsupported format)   |

use matchbook_recon::ReconError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Reconciliation completed but left unreconciled rows or report rows.
/// Like `diff(1)`, exit 1 means "inputs differ". Only returned with `--strict`.
pub const EXIT_DISCREPANCIES: u8 = 1;

/// Usage error - bad arguments, missing required options.
/// Matches clap's own exit code for argument errors.
pub const EXIT_USAGE: u8 = 2;

/// Config could not be parsed or failed validation.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// Inputs could not be read or outputs could not be written.
pub const EXIT_RUNTIME: u8 = 4;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) | ReconError::MissingInput(_) => {
            EXIT_INVALID_CONFIG
        }
        ReconError::UnsupportedFormat(_) | ReconError::Read { .. } | ReconError::Write { .. } => {
            EXIT_RUNTIME
        }
    }
}
