// glpost - validate journal-entry sheets and post them to the accounting API

mod create;
mod exit_codes;
mod settings;
mod status;
mod submit;
mod writeback;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use glpost_journal::{load_csv_table, prepare, JournalConfig, JournalError, PreparedBatch, RowTable};
use serde_json::json;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use exit_codes::{journal_exit_code, EXIT_ERROR, EXIT_INPUT, EXIT_SUCCESS, EXIT_USAGE};
use settings::Settings;

#[derive(Parser)]
#[command(name = "glpost")]
#[command(about = "Validate journal-entry sheets and post them to the accounting API")]
#[command(version)]
struct Cli {
    /// Settings file (default: <config dir>/glpost/config.toml)
    #[arg(long, global = true, env = "GLPOST_CONFIG")]
    config: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a sheet and show how it will be grouped. No network access.
    #[command(after_help = "\
Examples:
  glpost check january.csv
  glpost check january.csv --json")]
    Check {
        /// Journal sheet exported as CSV
        csv: PathBuf,

        /// Print the entry inputs as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Post one journal entry per group and write the results back
    #[command(after_help = "\
Examples:
  glpost create january.csv
  glpost create january.csv --out january.done.csv
  glpost create january.csv --dry-run")]
    Create {
        /// Journal sheet exported as CSV
        csv: PathBuf,

        /// Where to write the sheet with Document/Status/Warning filled in
        /// (default: <name>.posted.csv next to the input)
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,

        /// Print the entry inputs that would be sent, then stop
        #[arg(long)]
        dry_run: bool,

        /// Print a JSON summary instead of a message
        #[arg(long)]
        json: bool,
    },

    /// Refresh the Status column for documents already posted
    #[command(after_help = "\
Examples:
  glpost status january.posted.csv
  glpost status january.posted.csv --out january.status.csv")]
    Status {
        /// Journal sheet exported as CSV, with the Document column filled in
        csv: PathBuf,

        /// Where to write the updated sheet (default: <name>.posted.csv)
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
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

fn run(cli: Cli) -> Result<(), CliError> {
    let settings = Settings::load(cli.config.as_deref())?;
    init_logging(cli.verbose || settings.debug);
    match settings.source {
        Some(ref path) => debug!("settings loaded from {}", path.display()),
        None => warn!("no settings file found, using defaults"),
    }

    match cli.command {
        Commands::Check { csv, json } => cmd_check(&settings, csv, json),
        Commands::Create { csv, out, dry_run, json } => {
            create::cmd_create(&settings, csv, out, dry_run, json)
        }
        Commands::Status { csv, out } => status::cmd_status(&settings, csv, out),
    }
}

/// Log filter from `GLPOST_LOG`, then `RUST_LOG`, else `info`. `verbose`
/// forces `debug`. Engine `log` records are bridged into `tracing`.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("GLPOST_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

// ============================================================================
// Shared input handling
// ============================================================================

/// Read a sheet from disk and load it over the configured schema. Returns
/// the raw text too, for write-back.
pub(crate) fn read_table(path: &Path, config: &JournalConfig) -> Result<(String, RowTable), CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::input(format!("cannot read {}: {}", path.display(), e)))?;
    let csv_data = match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    };
    let table = load_csv_table(&csv_data, config)?;
    Ok((csv_data, table))
}

// ============================================================================
// check
// ============================================================================

fn cmd_check(settings: &Settings, input: PathBuf, json_output: bool) -> Result<(), CliError> {
    let config = &settings.journal;
    let (_, table) = read_table(&input, config)?;
    let batch = prepare(&table, config)?;

    if json_output {
        let groups: Vec<_> = batch
            .groups
            .iter()
            .zip(batch.entries(config))
            .enumerate()
            .map(|(position, (group, entry))| {
                let rows: Vec<usize> =
                    group.origins().iter().map(|&o| config.physical_row(o)).collect();
                json!({
                    "group": group.key.label(position),
                    "rows": rows,
                    "input": entry,
                })
            })
            .collect();
        let text = serde_json::to_string_pretty(&json!({ "mode": batch.mode, "groups": groups }))
            .map_err(|e| CliError::io(format!("JSON encoding error: {}", e)))?;
        println!("{}", text);
    } else {
        print_check_summary(&batch, config);
    }
    Ok(())
}

fn print_check_summary(batch: &PreparedBatch, config: &JournalConfig) {
    println!(
        "OK: {} rows in {} groups ({})",
        batch.table.len(),
        batch.groups.len(),
        batch.mode
    );
    for (position, group) in batch.groups.iter().enumerate() {
        let rows: Vec<usize> = group.origins().iter().map(|&o| config.physical_row(o)).collect();
        println!("  {:<16} rows {}", group.key.label(position), row_ranges(&rows));
    }
}

/// Compress sorted row numbers into `2-3, 6` form.
fn row_ranges(rows: &[usize]) -> String {
    let mut parts = Vec::new();
    let mut i = 0;
    while i < rows.len() {
        let start = rows[i];
        let mut end = start;
        while i + 1 < rows.len() && rows[i + 1] == end + 1 {
            i += 1;
            end = rows[i];
        }
        if start == end {
            parts.push(start.to_string());
        } else {
            parts.push(format!("{}-{}", start, end));
        }
        i += 1;
    }
    parts.join(", ")
}

// ============================================================================
// Errors
// ============================================================================

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

    pub fn input(msg: impl Into<String>) -> Self {
        Self { code: EXIT_INPUT, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<JournalError> for CliError {
    fn from(err: JournalError) -> Self {
        let code = journal_exit_code(&err);
        let err_hint = match &err {
            JournalError::MissingColumn { .. } => {
                Some("check header_row and journal.columns in the settings file")
            }
            e if e.is_validation() => Some("nothing was sent; correct the sheet and run again"),
            _ => None,
        };
        let cli_err = CliError { code, message: err.to_string(), hint: None };
        match err_hint {
            Some(hint) => cli_err.with_hint(hint),
            None => cli_err,
        }
    }
}
