use std::collections::HashSet;

use serde::Deserialize;

use crate::derived::Projection;
use crate::error::ReconError;
use crate::model::ReconMode;
use crate::report::{ReportOptions, REPORT_COLUMNS};
use crate::validate::{RuleKind, Tolerance, ValidationRule};

pub const OUTPUT_RECONCILED: &str = "reconciled";
pub const OUTPUT_UNRECONCILED: &str = "unreconciled";
pub const OUTPUT_REPORT: &str = "report";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// One reconciliation job. Exactly one of `amount` / `rules` selects the mode.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconConfig {
    #[serde(default = "default_name")]
    pub name: String,
    pub source: SideConfig,
    pub target: SideConfig,
    #[serde(default)]
    pub amount: Option<AmountConfig>,
    #[serde(default)]
    pub rules: Vec<ValidationRule>,
    #[serde(default)]
    pub report: ReportOptions,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub projections: Vec<Projection>,
}

fn default_name() -> String {
    "reconciliation".into()
}

// ---------------------------------------------------------------------------
// Sides
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SideConfig {
    /// Input file, resolved relative to the config file's directory.
    #[serde(default)]
    pub file: String,
    /// Key field name on this side.
    #[serde(default)]
    pub key: String,
    /// Worksheet name for spreadsheet inputs; first sheet when absent.
    #[serde(default)]
    pub sheet: Option<String>,
}

impl SideConfig {
    pub fn new(file: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            key: key.into(),
            sheet: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Amount mode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct AmountConfig {
    #[serde(default = "default_amount_field")]
    pub field: String,
    /// Field name on the target side; defaults to `field`.
    #[serde(default)]
    pub target_field: Option<String>,
    #[serde(default)]
    pub tolerance: Tolerance,
}

fn default_amount_field() -> String {
    "amount".into()
}

impl Default for AmountConfig {
    fn default() -> Self {
        Self {
            field: default_amount_field(),
            target_field: None,
            tolerance: Tolerance::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Output directory, relative to the config file's directory.
    #[serde(default = "default_output_dir")]
    pub dir: String,
    #[serde(default = "default_reconciled")]
    pub reconciled: String,
    #[serde(default = "default_unreconciled")]
    pub unreconciled: String,
    #[serde(default = "default_report")]
    pub report: String,
}

fn default_output_dir() -> String {
    "output".into()
}
fn default_reconciled() -> String {
    "reconciled.csv".into()
}
fn default_unreconciled() -> String {
    "unreconciled.csv".into()
}
fn default_report() -> String {
    "report.csv".into()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            reconciled: default_reconciled(),
            unreconciled: default_unreconciled(),
            report: default_report(),
        }
    }
}

// ---------------------------------------------------------------------------
// Construct + Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    /// Amount-mode config with default report/output settings.
    pub fn amount(source: SideConfig, target: SideConfig, amount: AmountConfig) -> Self {
        Self {
            name: default_name(),
            source,
            target,
            amount: Some(amount),
            rules: Vec::new(),
            report: ReportOptions::default(),
            output: OutputConfig::default(),
            projections: Vec::new(),
        }
    }

    /// Rule-mode config with default report/output settings.
    pub fn rules(source: SideConfig, target: SideConfig, rules: Vec<ValidationRule>) -> Self {
        Self {
            amount: None,
            rules,
            ..Self::amount(source, target, AmountConfig::default())
        }
    }

    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Valid only after `validate()`: amount mode iff `[amount]` is present.
    pub fn mode(&self) -> ReconMode {
        if self.amount.is_some() {
            ReconMode::Amount
        } else {
            ReconMode::Rules
        }
    }

    /// Logical names produced by the selected mode, with their file names.
    pub fn builtin_outputs(&self) -> Vec<(&'static str, &str)> {
        match self.mode() {
            ReconMode::Amount => vec![
                (OUTPUT_RECONCILED, self.output.reconciled.as_str()),
                (OUTPUT_UNRECONCILED, self.output.unreconciled.as_str()),
            ],
            ReconMode::Rules => vec![(OUTPUT_REPORT, self.output.report.as_str())],
        }
    }

    /// Checks everything an in-memory run needs. File references are checked
    /// separately by `require_files` since in-memory callers have none.
    pub fn validate(&self) -> Result<(), ReconError> {
        if self.source.key.trim().is_empty() {
            return Err(ReconError::MissingInput("source.key".into()));
        }
        if self.target.key.trim().is_empty() {
            return Err(ReconError::MissingInput("target.key".into()));
        }

        match (&self.amount, self.rules.is_empty()) {
            (Some(_), false) => {
                return Err(ReconError::ConfigValidation(
                    "[amount] and [[rules]] are mutually exclusive".into(),
                ));
            }
            (None, true) => {
                return Err(ReconError::ConfigValidation(
                    "one of [amount] or [[rules]] is required".into(),
                ));
            }
            _ => {}
        }

        if let Some(ref amount) = self.amount {
            if amount.field.trim().is_empty() {
                return Err(ReconError::ConfigValidation("amount.field is empty".into()));
            }
            if amount.target_field.as_deref().is_some_and(|f| f.trim().is_empty()) {
                return Err(ReconError::ConfigValidation("amount.target_field is empty".into()));
            }
            let t = amount.tolerance.amount();
            if !t.is_finite() || t < 0.0 {
                return Err(ReconError::ConfigValidation(format!(
                    "tolerance must be a non-negative number, got {t}"
                )));
            }
        }

        for (i, rule) in self.rules.iter().enumerate() {
            if rule.field.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!("rules[{i}]: field is empty")));
            }
            match (rule.kind, rule.tolerance_pct) {
                (RuleKind::String, Some(_)) => {
                    return Err(ReconError::ConfigValidation(format!(
                        "rules[{i}] '{}': tolerance_pct only applies to numeric rules",
                        rule.field
                    )));
                }
                (RuleKind::Numeric, Some(t)) if !t.is_finite() || t < 0.0 => {
                    return Err(ReconError::ConfigValidation(format!(
                        "rules[{i}] '{}': tolerance_pct must be non-negative, got {t}",
                        rule.field
                    )));
                }
                _ => {}
            }
        }

        if !self.rules.is_empty() && REPORT_COLUMNS.contains(&self.source.key.as_str()) {
            return Err(ReconError::ConfigValidation(format!(
                "source.key '{}' collides with a report column ({})",
                self.source.key,
                REPORT_COLUMNS.join(", ")
            )));
        }

        self.validate_outputs()
    }

    fn validate_outputs(&self) -> Result<(), ReconError> {
        let builtin = self.builtin_outputs();
        let mut names: HashSet<&str> = HashSet::new();
        let mut files: HashSet<String> = HashSet::new();

        for (name, file) in &builtin {
            if file.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!("output.{name} is empty")));
            }
            names.insert(name);
            if !files.insert(file.to_string()) {
                return Err(ReconError::ConfigValidation(format!(
                    "output file '{file}' is used more than once"
                )));
            }
        }

        for projection in &self.projections {
            if projection.name.trim().is_empty() {
                return Err(ReconError::ConfigValidation("projection name is empty".into()));
            }
            if [OUTPUT_RECONCILED, OUTPUT_UNRECONCILED, OUTPUT_REPORT].contains(&projection.name.as_str())
                || !names.insert(projection.name.as_str())
            {
                return Err(ReconError::ConfigValidation(format!(
                    "projection name '{}' is already in use",
                    projection.name
                )));
            }
            if !builtin.iter().any(|(name, _)| *name == projection.from) {
                return Err(ReconError::ConfigValidation(format!(
                    "projection '{}': '{}' is not an output of {} mode",
                    projection.name,
                    projection.from,
                    self.mode()
                )));
            }
            if projection.columns.is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "projection '{}' has no columns",
                    projection.name
                )));
            }
            let file = projection.file_name();
            if !files.insert(file.clone()) {
                return Err(ReconError::ConfigValidation(format!(
                    "output file '{file}' is used more than once"
                )));
            }
        }

        Ok(())
    }

    /// File-backed runs need both input references.
    pub fn require_files(&self) -> Result<(), ReconError> {
        if self.source.file.trim().is_empty() {
            return Err(ReconError::MissingInput("source.file".into()));
        }
        if self.target.file.trim().is_empty() {
            return Err(ReconError::MissingInput("target.file".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
