use std::collections::BTreeMap;
use std::fmt;

use ordered_float::OrderedFloat;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// A scalar field value. Readers produce these; the engine never mutates them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Number(f64),
    Text(String),
}

static NULL: Value = Value::Null;

impl Value {
    /// Interpret a raw cell: blank -> Null, finite numeric -> Number, else Text.
    ///
    /// `NaN`, `inf` and `infinity` stay text.
    pub fn from_input(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Null;
        }
        match parse_finite(trimmed) {
            Some(n) => Value::Number(n),
            None => Value::Text(raw.to_string()),
        }
    }

    /// Numeric coercion. Text is trimmed before parsing; Null never converts.
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(s) => parse_finite(s.trim()),
            Value::Null => None,
        }
    }

    /// Canonical string form used for string comparison and text output.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Number(n) => format_number(*n),
            Value::Text(s) => s.clone(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

fn parse_finite(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Hashable form of a non-null value, used to index records by key.
///
/// Numbers and text never compare equal: `1001` and `"1001"` are different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyValue {
    Number(OrderedFloat<f64>),
    Text(String),
}

impl KeyValue {
    /// None for Null and NaN; those records can never match.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Number(n) if n.is_nan() => None,
            // + 0.0 folds -0.0 into 0.0
            Value::Number(n) => Some(KeyValue::Number(OrderedFloat(*n + 0.0))),
            Value::Text(s) => Some(KeyValue::Text(s.clone())),
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Number(n) => f.write_str(&format_number(n.0)),
            KeyValue::Text(s) => f.write_str(s),
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One row: field name -> value, in the order fields were first seen.
///
/// Field access is total: an absent field reads as `Value::Null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

pub type RecordSet = Vec<Record>;

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut record = Record::new();
        for (k, v) in pairs {
            record.insert(k, v);
        }
        record
    }

    pub fn get(&self, name: &str) -> &Value {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
            .unwrap_or(&NULL)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == name)
    }

    /// Set a field, overwriting in place if it already exists.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Union of both records; `other` wins on collisions, `self`'s order comes first.
    pub fn merged_with(&self, other: &Record) -> Record {
        let mut merged = self.clone();
        for (k, v) in &other.fields {
            merged.insert(k.clone(), v.clone());
        }
        merged
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Union of field names across a record set, in first-seen order.
pub fn column_union(records: &[Record]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for record in records {
        for name in record.field_names() {
            if !columns.iter().any(|c| c == name) {
                columns.push(name.to_string());
            }
        }
    }
    columns
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// A source record linked to a target record by equal key values.
///
/// Indices are positions in the original input sequences.
#[derive(Debug, Clone)]
pub struct MatchedPair {
    pub source_index: usize,
    pub target_index: usize,
    pub source: Record,
    pub target: Record,
}

#[derive(Debug, Clone, Default)]
pub struct MatchResult {
    pub matched_pairs: Vec<MatchedPair>,
    pub unmatched_source: RecordSet,
    pub unmatched_target: RecordSet,
}

// ---------------------------------------------------------------------------
// Validation outputs
// ---------------------------------------------------------------------------

/// Mode A output: every input row lands in exactly one side.
#[derive(Debug, Clone, Default)]
pub struct AmountSplit {
    pub reconciled: RecordSet,
    pub unreconciled: RecordSet,
    /// Matched pairs routed to `unreconciled` because a value was not numeric.
    pub invalid_numeric: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconMode {
    /// Single numeric field, reconciled/unreconciled split.
    Amount,
    /// Named rules, flat discrepancy report.
    Rules,
}

impl fmt::Display for ReconMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Amount => write!(f, "amount"),
            Self::Rules => write!(f, "rules"),
        }
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconSummary {
    pub source_records: usize,
    pub target_records: usize,
    pub matched: usize,
    pub unmatched_source: usize,
    pub unmatched_target: usize,
    /// Target rows whose key repeats an earlier target row (never matchable).
    pub stranded_duplicates: usize,
    pub reconciled: usize,
    pub unreconciled: usize,
    pub invalid_numeric: usize,
    pub report_rows: usize,
    pub severity_counts: BTreeMap<String, usize>,
}

impl ReconSummary {
    /// True when anything needs attention: an unreconciled row or a report row.
    pub fn has_discrepancies(&self) -> bool {
        self.unreconciled > 0 || self.report_rows > 0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub mode: ReconMode,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    /// Logical output name (`reconciled`, `unreconciled`, `report`, projections) -> rows.
    pub outputs: BTreeMap<String, RecordSet>,
}
