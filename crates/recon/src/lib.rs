//! `matchbook-recon`: key-based two-source reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded records, returns classified results.
//! File formats are supplied by the caller through [`workflow::RecordReader`]
//! and [`workflow::RecordWriter`].

pub mod classify;
pub mod config;
pub mod derived;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod model;
pub mod presets;
pub mod report;
pub mod summary;
pub mod validate;
pub mod workflow;

pub use config::{AmountConfig, ReconConfig, SideConfig};
pub use engine::run;
pub use error::ReconError;
pub use model::{Record, RecordSet, ReconMode, ReconResult, ReconSummary, Value};
pub use validate::{Tolerance, ValidationRule};
pub use workflow::{run_workflow, RecordReader, RecordWriter, WorkflowOutput};
