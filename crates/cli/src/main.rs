// immofuse CLI - merge building registry and energy-performance exports

mod exit_codes;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use immofuse_cli::pipeline::{inspect_sources, run_pipeline, InspectReport, PipelineError, PipelineReport};
use immofuse_config::{ConfigError, PipelineConfig, DEFAULT_CONFIG_TOML};
use immofuse_io::split::{split_file, SplitOutcome};
use immofuse_io::SplitError;
use immofuse_merge::model::Consolidation;
use serde::Serialize;

use exit_codes::{
    config_exit_code, pipeline_exit_code, split_exit_code, ErrorOutput, EXIT_ERROR, EXIT_SUCCESS,
};

#[derive(Parser)]
#[command(name = "immofuse")]
#[command(about = "Clean, join and consolidate building registry and energy-performance CSV exports")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Log at debug level
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ConfigArg {
    /// TOML config file (defaults are used when omitted)
    #[arg(long, short = 'c', env = "IMMOFUSE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load both sources, merge them and write the consolidated CSV
    #[command(after_help = "\
Examples:
  immofuse run
  immofuse run --left bnb.csv --right ademe.csv -o merged.csv
  immofuse run -c immofuse.toml --json > report.json")]
    Run {
        #[command(flatten)]
        config: ConfigArg,

        /// Building registry CSV (source A)
        #[arg(long)]
        left: Option<PathBuf>,

        /// Energy-performance CSV (source B)
        #[arg(long)]
        right: Option<PathBuf>,

        /// Consolidated output CSV, overwritten if present
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Print the run report as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Split a CSV into numbered files, each with the header
    #[command(after_help = "\
Examples:
  immofuse split df_consolide.csv
  immofuse split big.csv --prefix out/part_ --max-lines 50000 --max-files 10")]
    Split {
        /// CSV file to split
        input: PathBuf,

        #[command(flatten)]
        config: ConfigArg,

        /// Output file prefix; files are named {prefix}{n}.csv
        #[arg(long)]
        prefix: Option<String>,

        /// Data rows per file, header excluded
        #[arg(long)]
        max_lines: Option<usize>,

        /// Stop after this many files
        #[arg(long)]
        max_files: Option<usize>,

        /// Print the split outcome as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Show both sources' headers and the keys a run would join on
    Inspect {
        #[command(flatten)]
        config: ConfigArg,

        #[arg(long)]
        left: Option<PathBuf>,

        #[arg(long)]
        right: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },

    /// Print a commented config file with the default settings
    InitConfig,
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\ntarget:  ", env!("TARGET"),
    )
}

fn init_logging(verbose: bool, quiet: bool) {
    let default_filter = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "info"
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let (result, json) = match cli.command {
        Commands::Run { config, left, right, output, json } => {
            (cmd_run(config.config, left, right, output, json), json)
        }
        Commands::Split { input, config, prefix, max_lines, max_files, json } => {
            (cmd_split(input, config.config, prefix, max_lines, max_files, json), json)
        }
        Commands::Inspect { config, left, right, json } => {
            (cmd_inspect(config.config, left, right, json), json)
        }
        Commands::InitConfig => {
            print!("{DEFAULT_CONFIG_TOML}");
            (Ok(()), false)
        }
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            ErrorOutput::new(code, message).print(json, hint.as_deref());
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
    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        let hint = match &err {
            ConfigError::Io { .. } => Some("run `immofuse init-config > immofuse.toml` to create one"),
            _ => None,
        };
        Self {
            code: config_exit_code(&err),
            message: err.to_string(),
            hint: hint.map(str::to_string),
        }
    }
}

impl From<PipelineError> for CliError {
    fn from(err: PipelineError) -> Self {
        Self { code: pipeline_exit_code(&err), message: err.to_string(), hint: None }
    }
}

impl From<SplitError> for CliError {
    fn from(err: SplitError) -> Self {
        Self { code: split_exit_code(&err), message: err.to_string(), hint: None }
    }
}

// ============================================================================
// helpers
// ============================================================================

fn load_config(path: Option<PathBuf>) -> Result<PipelineConfig, CliError> {
    match path {
        Some(path) => Ok(PipelineConfig::load(&path)?),
        None => Ok(PipelineConfig::default()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let out = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::general(format!("cannot serialize report: {e}")))?;
    println!("{out}");
    Ok(())
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".to_string())
}

// ============================================================================
// run
// ============================================================================

fn cmd_run(
    config_path: Option<PathBuf>,
    left: Option<PathBuf>,
    right: Option<PathBuf>,
    output: Option<PathBuf>,
    json: bool,
) -> Result<(), CliError> {
    let mut config = load_config(config_path)?;
    if let Some(left) = left {
        config.sources.left = left;
    }
    if let Some(right) = right {
        config.sources.right = right;
    }
    if let Some(output) = output {
        config.sources.output = output;
    }

    let report = run_pipeline(&config).map_err(|e| {
        let hint = match &e {
            PipelineError::Load(_) => Some("check --left/--right or the [sources] section"),
            _ => None,
        };
        let err = CliError::from(e);
        match hint {
            Some(h) => err.with_hint(h),
            None => err,
        }
    })?;

    if json {
        print_json(&report)?;
    } else {
        print_run_summary(&report);
    }
    Ok(())
}

fn print_run_summary(report: &PipelineReport) {
    let s = &report.summary;
    eprintln!(
        "rows: {} left (filtered), {} right -> {} merged",
        s.left_rows, s.right_rows, s.merged_rows
    );
    if s.join_keys.is_empty() {
        eprintln!("join: none, tables concatenated");
    } else {
        eprintln!("join: {}", s.join_keys.join(", "));
    }
    eprintln!(
        "provenance: {} both, {} left_only, {} right_only",
        s.provenance.both, s.provenance.left_only, s.provenance.right_only
    );
    for n in [&s.left_normalize, &s.right_normalize] {
        eprintln!(
            "normalize {}: {} valid, {} rejected ({} unparsable, {} out of range)",
            n.column,
            n.valid,
            n.rejected(),
            n.unparsable + n.coordinates + n.no_digits,
            n.out_of_range
        );
    }
    match &s.consolidation {
        Consolidation::Coalesced { right, left } => {
            eprintln!("consolidate: {right} over {left}")
        }
        Consolidation::Single { column } => {
            eprintln!("consolidate: from {column}")
        }
        Consolidation::Absent => eprintln!("consolidate: no source column"),
    }
    let f = &s.field;
    eprintln!(
        "{}: {} rows, {} non-missing, min {}, max {}, mean {}, std {}",
        f.column,
        f.rows,
        f.non_missing,
        fmt_opt(f.min),
        fmt_opt(f.max),
        fmt_opt(f.mean),
        fmt_opt(f.std_dev)
    );
    for d in &s.diagnostics {
        eprintln!("warning: {d}");
    }
    eprintln!("wrote {}", report.output.display());
}

// ============================================================================
// split
// ============================================================================

fn cmd_split(
    input: PathBuf,
    config_path: Option<PathBuf>,
    prefix: Option<String>,
    max_lines: Option<usize>,
    max_files: Option<usize>,
    json: bool,
) -> Result<(), CliError> {
    let mut split = load_config(config_path)?.split;
    if let Some(prefix) = prefix {
        split.prefix = prefix;
    }
    if let Some(n) = max_lines {
        split.max_lines_per_file = n;
    }
    if let Some(n) = max_files {
        split.max_files = n;
    }
    split.validate()?;

    let outcome = split_file(&input, &split)?;
    if json {
        print_json(&outcome)?;
    } else {
        print_split_summary(&outcome);
    }
    Ok(())
}

fn print_split_summary(outcome: &SplitOutcome) {
    for (path, rows) in outcome.chunk_paths.iter().zip(&outcome.rows_per_chunk) {
        eprintln!("{}: {} rows", path.display(), rows);
    }
    for d in &outcome.diagnostics {
        eprintln!("warning: {d}");
    }
    eprintln!(
        "{} file(s), {} rows written",
        outcome.chunk_paths.len(),
        outcome.rows_written
    );
}

// ============================================================================
// inspect
// ============================================================================

fn cmd_inspect(
    config_path: Option<PathBuf>,
    left: Option<PathBuf>,
    right: Option<PathBuf>,
    json: bool,
) -> Result<(), CliError> {
    let mut config = load_config(config_path)?;
    if let Some(left) = left {
        config.sources.left = left;
    }
    if let Some(right) = right {
        config.sources.right = right;
    }

    let report = inspect_sources(&config)?;
    if json {
        print_json(&report)?;
    } else {
        print_inspect(&report, &config.field.name);
    }
    Ok(())
}

fn print_inspect(report: &InspectReport, field: &str) {
    for side in [&report.left, &report.right] {
        let h = &side.headers;
        let position = match (&side.field_column, side.field_position) {
            (Some(name), Some(p)) => format!("{name} (column {})", p + 1),
            _ => "not found".to_string(),
        };
        eprintln!("{}: {} columns, {field}: {position}", h.path, h.column_count);
        eprintln!("  {}", h.columns.join(", "));
    }
    if report.join_keys.is_empty() {
        eprintln!("join keys: none");
    } else {
        eprintln!("join keys: {}", report.join_keys.join(", "));
    }
    for d in &report.diagnostics {
        eprintln!("warning: {d}");
    }
}
