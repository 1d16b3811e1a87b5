//! End-to-end run: load both sources, merge, write the consolidated CSV.

use std::path::{Path, PathBuf};

use immofuse_config::{ConfigError, PipelineConfig};
use immofuse_io::csv::{inspect_headers, load_filtered, load_table, write_table, HeaderReport};
use immofuse_core::{Diagnostic, Diagnostics, Side, Table};
use immofuse_io::{LoadError, WriteError};
use immofuse_merge::keys::resolve_join_keys;
use immofuse_merge::normalize::normalize_table;
use immofuse_merge::MergeSummary;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Write(#[from] WriteError),
}

/// Everything a run produced besides the output file itself.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub left: PathBuf,
    pub right: PathBuf,
    pub output: PathBuf,
    #[serde(flatten)]
    pub summary: MergeSummary,
}

/// Load, normalize, merge, consolidate and write.
///
/// Fails only on invalid config or unreadable/unwritable files. Every other
/// problem is a diagnostic in the report.
pub fn run_pipeline(config: &PipelineConfig) -> Result<PipelineReport, PipelineError> {
    config.validate()?;
    let sources = &config.sources;

    let left = load_filtered(&sources.left, &sources.left_row_prefix)?;
    let right = load_table(&sources.right)?;

    let outcome = immofuse_merge::run(&config.field, &config.join, left, right);
    write_table(&outcome.table, &sources.output)?;

    Ok(PipelineReport {
        left: sources.left.clone(),
        right: sources.right.clone(),
        output: sources.output.clone(),
        summary: outcome.summary,
    })
}

/// One source's header as a run would see it.
#[derive(Debug, Clone, Serialize)]
pub struct SourceInspection {
    #[serde(flatten)]
    pub headers: HeaderReport,
    /// Column the field would be read from, if any matches.
    pub field_column: Option<String>,
    /// Zero-based position of `field_column`.
    pub field_position: Option<usize>,
}

/// Header overview of both sources, without loading their rows.
#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    pub left: SourceInspection,
    pub right: SourceInspection,
    /// Keys a run would join on.
    pub join_keys: Vec<String>,
    pub diagnostics: Diagnostics,
}

/// Resolve the field column and join keys from the headers alone.
///
/// Headers go through the same normalize step as a run, so the reported
/// field column and join keys are the ones `run_pipeline` would use.
pub fn inspect_sources(config: &PipelineConfig) -> Result<InspectReport, PipelineError> {
    config.validate()?;
    let mut diagnostics = Diagnostics::new();

    let (left, left_names) =
        inspect_side(&config.sources.left, config, Side::Left, &mut diagnostics)?;
    let (right, right_names) =
        inspect_side(&config.sources.right, config, Side::Right, &mut diagnostics)?;
    let join_keys = resolve_join_keys(&left_names, &right_names, &config.join.priority_keys);
    if join_keys.is_empty() {
        diagnostics.push(Diagnostic::NoJoinKeys);
    }

    Ok(InspectReport { left, right, join_keys, diagnostics })
}

/// Inspection of one file plus its column names after normalization.
fn inspect_side(
    path: &Path,
    config: &PipelineConfig,
    side: Side,
    diagnostics: &mut Diagnostics,
) -> Result<(SourceInspection, Vec<String>), PipelineError> {
    let headers = inspect_headers(path)?;
    let header_only = Table::with_headers(headers.columns.clone());
    let (table, stats) = normalize_table(header_only, &config.field, side, diagnostics);

    let field_column = stats.found.then_some(stats.column);
    let field_position = field_column
        .as_ref()
        .and_then(|name| headers.columns.iter().position(|c| c == name));
    let names = table.column_names().into_iter().map(str::to_string).collect();

    Ok((SourceInspection { headers, field_column, field_position }, names))
}
