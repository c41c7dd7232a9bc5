//! Field validators. All are total: unparseable input is a mismatch, never an error.

use serde::{Deserialize, Serialize};

use crate::model::{Record, Value};

/// One minor currency unit.
pub const DEFAULT_ABS_TOLERANCE: f64 = 0.01;

pub const DEFAULT_SEVERITY: &str = "Error";

/// Percentage tolerance relative to the source value's magnitude.
///
/// The allowed deviation is `|v1| * tolerance_pct / 100`, so a zero source
/// value only accepts an exact match.
pub fn numeric_ok(v1: &Value, v2: &Value, tolerance_pct: f64) -> bool {
    match (v1.to_number(), v2.to_number()) {
        (Some(a), Some(b)) => pct_ok(a, b, tolerance_pct),
        _ => false,
    }
}

fn pct_ok(v1: f64, v2: f64, tolerance_pct: f64) -> bool {
    let allowed = v1.abs() * tolerance_pct / 100.0;
    (v1 - v2).abs() <= allowed
}

/// Absolute-difference check used for plain amount reconciliation.
pub fn diff_ok(v1: f64, v2: f64, abs_tolerance: f64) -> bool {
    (v1 - v2).abs() <= abs_tolerance
}

/// Exact equality of canonical string forms. No trimming, case-sensitive.
pub fn string_ok(v1: &Value, v2: &Value) -> bool {
    v1.to_text() == v2.to_text()
}

// ---------------------------------------------------------------------------
// Tolerance (amount mode)
// ---------------------------------------------------------------------------

/// How close two amounts must be to count as reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tolerance {
    /// Percent of the source value.
    Percent(f64),
    /// Absolute difference.
    Absolute(f64),
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::Absolute(DEFAULT_ABS_TOLERANCE)
    }
}

impl Tolerance {
    pub fn accepts(&self, v1: f64, v2: f64) -> bool {
        match *self {
            Self::Percent(pct) => pct_ok(v1, v2, pct),
            Self::Absolute(abs) => diff_ok(v1, v2, abs),
        }
    }

    pub fn amount(&self) -> f64 {
        match *self {
            Self::Percent(v) | Self::Absolute(v) => v,
        }
    }
}

impl std::fmt::Display for Tolerance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Percent(p) => write!(f, "{p}%"),
            Self::Absolute(a) => write!(f, "±{a}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Rules (report mode)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Numeric,
    #[default]
    String,
}

/// A named field comparison with a caller-defined severity label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
    pub field: String,
    /// Field name on the target side; defaults to `field`.
    #[serde(default)]
    pub target_field: Option<String>,
    #[serde(default)]
    pub kind: RuleKind,
    /// Numeric rules only. Defaults to 0 (exact).
    #[serde(default)]
    pub tolerance_pct: Option<f64>,
    #[serde(default = "default_severity")]
    pub severity: String,
}

fn default_severity() -> String {
    DEFAULT_SEVERITY.to_string()
}

impl ValidationRule {
    pub fn string(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            target_field: None,
            kind: RuleKind::String,
            tolerance_pct: None,
            severity: default_severity(),
        }
    }

    pub fn numeric(field: impl Into<String>, tolerance_pct: f64) -> Self {
        Self {
            kind: RuleKind::Numeric,
            tolerance_pct: Some(tolerance_pct),
            ..Self::string(field)
        }
    }

    pub fn against(mut self, target_field: impl Into<String>) -> Self {
        self.target_field = Some(target_field.into());
        self
    }

    pub fn with_severity(mut self, severity: impl Into<String>) -> Self {
        self.severity = severity.into();
        self
    }

    pub fn target_field(&self) -> &str {
        self.target_field.as_deref().unwrap_or(&self.field)
    }

    /// True when the pair passes this rule.
    pub fn check(&self, source: &Record, target: &Record) -> bool {
        let v1 = source.get(&self.field);
        let v2 = target.get(self.target_field());
        match self.kind {
            RuleKind::Numeric => numeric_ok(v1, v2, self.tolerance_pct.unwrap_or(0.0)),
            RuleKind::String => string_ok(v1, v2),
        }
    }
}
