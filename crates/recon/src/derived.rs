//! Derived datasets: reshaped copies of an engine output.

use serde::Deserialize;

use crate::model::{Record, RecordSet, Value};

/// A named output built by selecting and renaming columns of another output.
#[derive(Debug, Clone, Deserialize)]
pub struct Projection {
    pub name: String,
    /// Logical name of the output to reshape (`unreconciled`, `report`, ...).
    pub from: String,
    /// Output file name; defaults to `<name>.csv`.
    #[serde(default)]
    pub file: Option<String>,
    pub columns: Vec<ProjectedColumn>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectedColumn {
    pub name: String,
    /// Candidate source fields, in priority order. Empty means `[name]`.
    #[serde(default)]
    pub from: Vec<String>,
}

impl ProjectedColumn {
    pub fn new(name: impl Into<String>, from: &[&str]) -> Self {
        Self {
            name: name.into(),
            from: from.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// First non-null candidate, else Null.
    fn resolve(&self, record: &Record) -> Value {
        if self.from.is_empty() {
            return record.get(&self.name).clone();
        }
        self.from
            .iter()
            .map(|field| record.get(field))
            .find(|v| !v.is_null())
            .cloned()
            .unwrap_or_default()
    }
}

impl Projection {
    pub fn file_name(&self) -> String {
        self.file.clone().unwrap_or_else(|| format!("{}.csv", self.name))
    }

    /// Every input row yields one output row with exactly the projected columns.
    pub fn apply(&self, rows: &[Record]) -> RecordSet {
        rows.iter()
            .map(|row| {
                let mut out = Record::new();
                for column in &self.columns {
                    out.insert(column.name.clone(), column.resolve(row));
                }
                out
            })
            .collect()
    }
}
