// Non-fatal conditions recorded during a run.
// Stages absorb these and keep going; the caller decides how to surface them.

use std::fmt;

use serde::Serialize;

/// Which input a condition refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Source A, the filtered building registry.
    Left,
    /// Source B, the energy-performance records.
    Right,
    /// The merged table.
    Merged,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
            Side::Merged => "merged",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Normalize,
    Consolidate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normalize => write!(f, "normalize"),
            Self::Consolidate => write!(f, "consolidate"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A required column was absent and was substituted with an all-missing column.
    MissingColumn { stage: Stage, side: Side, column: String },
    /// The inputs share no column; rows were concatenated instead of joined.
    NoJoinKeys,
    /// The splitter hit its file limit and dropped the remaining rows.
    SplitTruncated { max_files: usize, discarded_rows: u64 },
    /// The input had no header line, so nothing was produced.
    EmptyInput { path: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingColumn { stage, side, column } => {
                write!(f, "{stage}: column '{column}' not found on {side} side, filled with missing values")
            }
            Self::NoJoinKeys => write!(f, "no shared columns, tables concatenated without a join"),
            Self::SplitTruncated { max_files, discarded_rows } => {
                write!(f, "file limit of {max_files} reached, {discarded_rows} row(s) discarded")
            }
            Self::EmptyInput { path } => write!(f, "'{path}' has no header line, nothing to do"),
        }
    }
}

/// Ordered collection of diagnostics for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic and log it at warn level.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        log::warn!("{diagnostic}");
        self.0.push(diagnostic);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
