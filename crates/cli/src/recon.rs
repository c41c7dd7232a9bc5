//! `mbook run` / `validate` / `match` / `init`.

use std::path::{Path, PathBuf};

use matchbook_io::{FileReader, FileWriter};
use matchbook_recon::model::ReconMode;
use matchbook_recon::presets::{preset, PRESET_NAMES};
use matchbook_recon::validate::RuleKind;
use matchbook_recon::{
    run_workflow, AmountConfig, ReconConfig, SideConfig, Tolerance, ValidationRule, WorkflowOutput,
};
use tracing::debug;

use crate::exit_codes::EXIT_DISCREPANCIES;
use crate::{CliError, MatchArgs, ReportArgs};

// ============================================================================
// run
// ============================================================================

pub fn cmd_run(config_path: PathBuf, out_dir: Option<PathBuf>, report: ReportArgs) -> Result<(), CliError> {
    let mut config = load_config(&config_path)?;
    config.require_files()?;

    if let Some(dir) = out_dir {
        config.output.dir = absolute_dir(&dir)?;
    }

    // Resolve file paths relative to config file's directory
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new(""));
    debug!(config = %config_path.display(), base_dir = %base_dir.display(), "running");

    let output = run_workflow(&config, base_dir, &FileReader, &FileWriter)?;
    emit(&output, &report)
}

fn load_config(path: &Path) -> Result<ReconConfig, CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read config {}: {e}", path.display())))?;
    Ok(ReconConfig::from_toml(&text)?)
}

fn absolute_dir(dir: &Path) -> Result<String, CliError> {
    let dir = if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| CliError::io(format!("cannot resolve working directory: {e}")))?
            .join(dir)
    };
    path_text(&dir, "--out-dir")
}

fn path_text(path: &Path, flag: &str) -> Result<String, CliError> {
    path.to_str()
        .map(str::to_string)
        .ok_or_else(|| CliError::args(format!("{flag}: path is not valid UTF-8: {}", path.display())))
}

// ============================================================================
// Output
// ============================================================================

fn emit(output: &WorkflowOutput, report: &ReportArgs) -> Result<(), CliError> {
    if report.json || report.output.is_some() {
        let json_str = serde_json::to_string_pretty(output)
            .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;

        if let Some(ref path) = report.output {
            std::fs::write(path, &json_str)
                .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))?;
            eprintln!("wrote {}", path.display());
        }

        if report.json {
            println!("{json_str}");
        }
    }

    // Human summary to stderr
    for (name, path) in &output.files {
        eprintln!("{name}: {}", path.display());
    }
    eprintln!("{}", summary_line(output));

    let s = &output.result.summary;
    if s.stranded_duplicates > 0 {
        eprintln!(
            "note: {} target row(s) repeat an earlier key and could not match",
            s.stranded_duplicates
        );
    }

    if report.strict && s.has_discrepancies() {
        return Err(CliError {
            code: EXIT_DISCREPANCIES,
            message: "discrepancies found".into(),
            hint: None,
        });
    }
    Ok(())
}

fn summary_line(output: &WorkflowOutput) -> String {
    let meta = &output.result.meta;
    let s = &output.result.summary;
    let detail = match meta.mode {
        ReconMode::Amount if s.invalid_numeric > 0 => format!(
            "{} reconciled, {} unreconciled ({} invalid numeric)",
            s.reconciled, s.unreconciled, s.invalid_numeric
        ),
        ReconMode::Amount => format!("{} reconciled, {} unreconciled", s.reconciled, s.unreconciled),
        ReconMode::Rules if s.severity_counts.is_empty() => format!("{} report rows", s.report_rows),
        ReconMode::Rules => {
            let counts: Vec<String> = s
                .severity_counts
                .iter()
                .map(|(severity, n)| format!("{severity}: {n}"))
                .collect();
            format!("{} report rows ({})", s.report_rows, counts.join(", "))
        }
    };
    format!(
        "{} recon '{}': {} matched, {}, {} unmatched source, {} unmatched target",
        meta.mode, meta.config_name, s.matched, detail, s.unmatched_source, s.unmatched_target
    )
}

// ============================================================================
// validate
// ============================================================================

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    config.require_files()?;

    let what = match config.mode() {
        ReconMode::Amount => {
            let field = config.amount.as_ref().map(|a| a.field.as_str()).unwrap_or_default();
            format!("field '{field}'")
        }
        ReconMode::Rules => format!("{} rule(s)", config.rules.len()),
    };
    eprintln!(
        "valid: {} recon '{}' on {} ({} by '{}' vs {} by '{}')",
        config.mode(),
        config.name,
        what,
        config.source.file,
        config.source.key,
        config.target.file,
        config.target.key,
    );
    Ok(())
}

// ============================================================================
// match
// ============================================================================

pub fn cmd_match(args: MatchArgs) -> Result<(), CliError> {
    let config = config_from_args(&args)?;
    config.validate().map_err(|e| CliError::args(e.to_string()))?;

    // plain paths from the command line resolve against the working directory
    let output = run_workflow(&config, Path::new(""), &FileReader, &FileWriter)?;
    emit(&output, &args.report)
}

fn config_from_args(args: &MatchArgs) -> Result<ReconConfig, CliError> {
    let (source_key, target_key) = match (&args.key, &args.source_key, &args.target_key) {
        (Some(key), _, _) => (key.clone(), key.clone()),
        (None, Some(s), Some(t)) => (s.clone(), t.clone()),
        _ => {
            return Err(CliError::args("no key given")
                .with_hint("pass --key K, or --source-key K1 --target-key K2"));
        }
    };

    let source = SideConfig {
        sheet: args.source_sheet.clone(),
        ..SideConfig::new(path_text(&args.source, "--source")?, source_key)
    };
    let target = SideConfig {
        sheet: args.target_sheet.clone(),
        ..SideConfig::new(path_text(&args.target, "--target")?, target_key)
    };

    let mut config = if args.rule.is_empty() {
        let tolerance = match (args.tolerance_pct, args.abs_tolerance) {
            (Some(pct), _) => Tolerance::Percent(pct),
            (None, Some(abs)) => Tolerance::Absolute(abs),
            (None, None) => Tolerance::default(),
        };
        ReconConfig::amount(
            source,
            target,
            AmountConfig {
                field: args.field.clone().unwrap_or_else(|| "amount".into()),
                target_field: args.target_field.clone(),
                tolerance,
            },
        )
    } else {
        if args.tolerance_pct.is_some() || args.abs_tolerance.is_some() {
            return Err(CliError::args("--tolerance-pct/--abs-tolerance apply to amount mode only")
                .with_hint("give numeric rules a tolerance with =numeric%P"));
        }
        let rules = args
            .rule
            .iter()
            .map(|spec| parse_rule(spec))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CliError::args(e).with_hint("rule syntax: FIELD[:TARGET_FIELD][=KIND][@SEVERITY]"))?;
        let mut config = ReconConfig::rules(source, target, rules);
        config.report.include_unmatched = args.include_unmatched;
        config
    };

    config.name = "match".into();
    config.output.dir = path_text(&args.out_dir, "--out-dir")?;
    Ok(config)
}

/// `FIELD[:TARGET_FIELD][=KIND][@SEVERITY]`, KIND = `string` | `numeric` | `numeric%P`.
fn parse_rule(spec: &str) -> Result<ValidationRule, String> {
    let (rest, severity) = match spec.rsplit_once('@') {
        Some((rest, severity)) => (rest, Some(severity.trim())),
        None => (spec, None),
    };
    let (fields, kind) = match rest.split_once('=') {
        Some((fields, kind)) => (fields, Some(kind.trim())),
        None => (rest, None),
    };
    let (field, target_field) = match fields.split_once(':') {
        Some((field, target)) => (field.trim(), Some(target.trim())),
        None => (fields.trim(), None),
    };

    if field.is_empty() {
        return Err(format!("rule '{spec}': field is empty"));
    }

    let mut rule = ValidationRule::string(field);
    match kind {
        None | Some("string") => {}
        Some("numeric") => rule.kind = RuleKind::Numeric,
        Some(other) => {
            let pct = other
                .strip_prefix("numeric%")
                .and_then(|p| p.parse::<f64>().ok())
                .ok_or_else(|| format!("rule '{spec}': unknown kind '{other}'"))?;
            rule = ValidationRule::numeric(field, pct);
        }
    }

    match target_field {
        Some("") => return Err(format!("rule '{spec}': target field is empty")),
        Some(target) => rule = rule.against(target),
        None => {}
    }
    match severity {
        Some("") => return Err(format!("rule '{spec}': severity is empty")),
        Some(severity) => rule = rule.with_severity(severity),
        None => {}
    }
    Ok(rule)
}

// ============================================================================
// init
// ============================================================================

pub fn cmd_init(name: &str, output: Option<PathBuf>, force: bool) -> Result<(), CliError> {
    let text = preset(name).ok_or_else(|| {
        CliError::args(format!("unknown preset '{name}'"))
            .with_hint(format!("available: {}", PRESET_NAMES.join(", ")))
    })?;

    let Some(path) = output else {
        print!("{text}");
        return Ok(());
    };

    if path.exists() && !force {
        return Err(CliError::args(format!("{} already exists", path.display()))
            .with_hint("pass --force to overwrite"));
    }
    std::fs::write(&path, text)
        .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))?;
    eprintln!("wrote {}", path.display());
    Ok(())
}
