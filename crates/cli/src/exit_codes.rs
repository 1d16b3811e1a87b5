//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                            |
//! |------|----------------------------------------------------|
//! | 0    | Success (diagnostics may still have been reported) |
//! | 1    | General error (unspecified)                        |
//! | 2    | CLI usage error (bad args)                         |
//! | 3    | File could not be read or written                  |
//! | 4    | Input file is not usable CSV                       |
//! | 5    | Invalid configuration                              |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the mapping functions below

use immofuse_config::ConfigError;
use immofuse_io::{LoadError, SplitError, WriteError};
use immofuse_cli::pipeline::PipelineError;

/// Success - command completed. Non-fatal diagnostics do not change this.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
/// clap exits with this code on its own parse failures.
pub const EXIT_USAGE: u8 = 2;

/// Source missing or unreadable, output not writable.
pub const EXIT_IO: u8 = 3;

/// Source readable but malformed (no header, broken quoting).
pub const EXIT_FORMAT: u8 = 4;

/// Config file unreadable, unparsable or failing validation.
pub const EXIT_CONFIG: u8 = 5;

// =============================================================================
// Error mapping
// =============================================================================

pub fn load_exit_code(err: &LoadError) -> u8 {
    if err.is_format() {
        EXIT_FORMAT
    } else {
        EXIT_IO
    }
}

pub fn write_exit_code(_err: &WriteError) -> u8 {
    EXIT_IO
}

pub fn config_exit_code(_err: &ConfigError) -> u8 {
    EXIT_CONFIG
}

pub fn pipeline_exit_code(err: &PipelineError) -> u8 {
    match err {
        PipelineError::Config(e) => config_exit_code(e),
        PipelineError::Load(e) => load_exit_code(e),
        PipelineError::Write(e) => write_exit_code(e),
    }
}

pub fn split_exit_code(err: &SplitError) -> u8 {
    match err {
        SplitError::Read { source, .. } if source.is_io_error() => EXIT_IO,
        SplitError::Read { .. } => EXIT_FORMAT,
        SplitError::Write(e) => write_exit_code(e),
    }
}

/// Structured error output for `--json` mode, printed on stderr.
#[derive(Debug, serde::Serialize)]
pub struct ErrorOutput {
    pub error: &'static str,
    pub message: String,
    pub exit_code: u8,
}

impl ErrorOutput {
    pub fn new(code: u8, message: impl Into<String>) -> Self {
        let error = match code {
            EXIT_IO => "io_error",
            EXIT_FORMAT => "format_error",
            EXIT_CONFIG => "config_error",
            EXIT_USAGE => "usage_error",
            _ => "error",
        };
        Self { error, message: message.into(), exit_code: code }
    }

    /// Print error to stderr (human-readable by default).
    pub fn print(&self, json: bool, hint: Option<&str>) {
        if json {
            if let Ok(output) = serde_json::to_string(self) {
                eprintln!("{}", output);
            }
            return;
        }
        if !self.message.is_empty() {
            eprintln!("error: {}", self.message);
        }
        if let Some(hint) = hint {
            eprintln!("hint:  {}", hint);
        }
    }
}
