// matchbook CLI - key-based two-source reconciliation

mod exit_codes;
mod logging;
mod recon;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::builder::PossibleValuesParser;
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use matchbook_recon::presets::PRESET_NAMES;
use matchbook_recon::ReconError;

use exit_codes::{recon_exit_code, EXIT_RUNTIME, EXIT_SUCCESS, EXIT_USAGE};
use logging::{init_logging, LogConfig, LogFormat};

#[derive(Parser)]
#[command(name = "mbook")]
#[command(about = "Match two record sources on a key and report what disagrees")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Adjust log verbosity (-v info, -vv debug, -vvv trace, -q errors only)
    #[command(flatten)]
    verbosity: Verbosity<WarnLevel>,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty", global = true)]
    log_format: LogFormatArg,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run reconciliation from a TOML config file
    #[command(after_help = "\
Examples:
  mbook run receivables.recon.toml
  mbook run receivables.recon.toml --json
  mbook run receivables.recon.toml --output result.json --strict
  mbook run hr.recon.toml --out-dir /tmp/may")]
    Run {
        /// Path to the .recon.toml config file
        config: PathBuf,

        #[command(flatten)]
        report: ReportArgs,

        /// Output directory, overriding [output].dir (relative to the working directory)
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Validate a recon config without running
    #[command(after_help = "\
Examples:
  mbook validate receivables.recon.toml")]
    Validate {
        /// Path to the .recon.toml config file
        config: PathBuf,
    },

    /// Reconcile two files described entirely by flags
    #[command(after_help = "\
Examples:
  mbook match --source deposits.csv --target billing.xlsx \\
      --source-key receipt_no --target-key invoice_number --field amount
  mbook match --source stock.csv --target count.csv --source-key sku_code --target-key sku \\
      --field system_quantity --target-field actual_quantity --tolerance-pct 2
  mbook match --source hr.csv --target depts.csv --source-key employee_id --target-key emp_id \\
      --rule department_code:dept@Warning --rule title_code

Rule syntax: FIELD[:TARGET_FIELD][=KIND][@SEVERITY]
  KIND is `string` (default), `numeric`, or `numeric%P` for a P percent tolerance.")]
    Match(MatchArgs),

    /// Write a starter config for a common reconciliation job
    #[command(after_help = "\
Examples:
  mbook init receivables
  mbook init inventory -o inventory.recon.toml")]
    Init {
        /// Preset name
        #[arg(value_parser = PossibleValuesParser::new(PRESET_NAMES.iter().copied()))]
        preset: String,

        /// Write to file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args)]
pub struct ReportArgs {
    /// Print the full result (including output paths) as JSON to stdout
    #[arg(long)]
    pub json: bool,

    /// Write the JSON result to a file
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Exit 1 when any row is unreconciled or reported
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args)]
pub struct MatchArgs {
    /// Source file (csv, tsv, xlsx, xls, xlsb, ods)
    #[arg(long)]
    pub source: PathBuf,

    /// Target file (csv, tsv, xlsx, xls, xlsb, ods)
    #[arg(long)]
    pub target: PathBuf,

    /// Worksheet to read from the source workbook
    #[arg(long)]
    pub source_sheet: Option<String>,

    /// Worksheet to read from the target workbook
    #[arg(long)]
    pub target_sheet: Option<String>,

    /// Key field with the same name on both sides
    #[arg(long, conflicts_with_all = ["source_key", "target_key"])]
    pub key: Option<String>,

    /// Key field on the source side
    #[arg(long, requires = "target_key")]
    pub source_key: Option<String>,

    /// Key field on the target side
    #[arg(long, requires = "source_key")]
    pub target_key: Option<String>,

    /// Numeric field to reconcile (amount mode; default `amount`)
    #[arg(long, conflicts_with = "rule")]
    pub field: Option<String>,

    /// Numeric field name on the target side
    #[arg(long, requires = "field")]
    pub target_field: Option<String>,

    /// Percent tolerance relative to the source value
    #[arg(long, conflicts_with = "abs_tolerance")]
    pub tolerance_pct: Option<f64>,

    /// Absolute tolerance (default 0.01)
    #[arg(long)]
    pub abs_tolerance: Option<f64>,

    /// Field rule (rules mode). Repeatable.
    #[arg(long, value_name = "SPEC")]
    pub rule: Vec<String>,

    /// Also report unmatched records (rules mode)
    #[arg(long, requires = "rule")]
    pub include_unmatched: bool,

    /// Output directory
    #[arg(long, default_value = "output")]
    pub out_dir: PathBuf,

    #[command(flatten)]
    pub report: ReportArgs,
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  matchbook-recon ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

fn log_config_from_cli(cli: &Cli) -> LogConfig {
    LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        use_env_filter: !cli.verbosity.is_present(),
        format: match cli.log_format {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Compact => LogFormat::Compact,
            LogFormatArg::Json => LogFormat::Json,
        },
        with_ansi: std::io::stderr().is_terminal(),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&log_config_from_cli(&cli)) {
        eprintln!("warning: logging disabled: {e}");
    }

    let result = match cli.command {
        Commands::Run { config, report, out_dir } => recon::cmd_run(config, out_dir, report),
        Commands::Validate { config } => recon::cmd_validate(config),
        Commands::Match(args) => recon::cmd_match(args),
        Commands::Init { preset, output, force } => recon::cmd_init(&preset, output, force),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_RUNTIME, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        let hint = match &err {
            ReconError::UnsupportedFormat(_) => {
                Some("supported: .csv .tsv .xlsx .xls .xlsb .ods (outputs: .csv .tsv .xlsx .json)".to_string())
            }
            ReconError::MissingInput(_) => Some("see `mbook init --help` for a complete config".to_string()),
            _ => None,
        };
        Self { code: recon_exit_code(&err), message: err.to_string(), hint }
    }
}
