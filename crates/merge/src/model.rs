use std::fmt;

use immofuse_core::{Diagnostics, Table};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Provenance
// ---------------------------------------------------------------------------

/// Which input(s) a merged row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    LeftOnly,
    RightOnly,
    Both,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::LeftOnly => "left_only",
            Provenance::RightOnly => "right_only",
            Provenance::Both => "both",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProvenanceCounts {
    pub left_only: usize,
    pub right_only: usize,
    pub both: usize,
}

impl ProvenanceCounts {
    pub fn record(&mut self, provenance: Provenance) {
        match provenance {
            Provenance::LeftOnly => self.left_only += 1,
            Provenance::RightOnly => self.right_only += 1,
            Provenance::Both => self.both += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.left_only + self.right_only + self.both
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// How a single value left the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizeOutcome {
    /// Was already missing.
    InputMissing,
    /// Was already a number.
    Passthrough,
    /// The whole cleaned string parsed.
    Parsed,
    /// Only the first digit run parsed.
    DigitFallback,
    /// Looked like a coordinate pair.
    Coordinates,
    /// No digit at all, or the `O` artifact.
    NoDigits,
    /// Contained digits but nothing parsable.
    Unparsable,
    /// Parsed but outside the plausibility range.
    OutOfRange,
}

/// Aggregate counts for one normalized column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeStats {
    pub column: String,
    /// False when the column was absent and created all-missing.
    pub found: bool,
    pub total: usize,
    pub input_missing: usize,
    pub passthrough: usize,
    pub parsed: usize,
    pub digit_fallback: usize,
    pub coordinates: usize,
    pub no_digits: usize,
    pub unparsable: usize,
    pub out_of_range: usize,
    /// Non-missing values after normalization.
    pub valid: usize,
}

impl NormalizeStats {
    pub fn record(&mut self, outcome: NormalizeOutcome, kept: bool) {
        self.total += 1;
        match outcome {
            NormalizeOutcome::InputMissing => self.input_missing += 1,
            NormalizeOutcome::Passthrough => self.passthrough += 1,
            NormalizeOutcome::Parsed => self.parsed += 1,
            NormalizeOutcome::DigitFallback => self.digit_fallback += 1,
            NormalizeOutcome::Coordinates => self.coordinates += 1,
            NormalizeOutcome::NoDigits => self.no_digits += 1,
            NormalizeOutcome::Unparsable => self.unparsable += 1,
            NormalizeOutcome::OutOfRange => self.out_of_range += 1,
        }
        if kept {
            self.valid += 1;
        }
    }

    /// Values that had content but ended up missing.
    pub fn rejected(&self) -> usize {
        self.coordinates + self.no_digits + self.unparsable + self.out_of_range
    }
}

// ---------------------------------------------------------------------------
// Consolidation
// ---------------------------------------------------------------------------

/// Where the consolidated field's values came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Consolidation {
    /// Right value when present, else left value.
    Coalesced { right: String, left: String },
    /// Copied from a single prefixed column.
    Single { column: String },
    /// No candidate column; filled with missing.
    Absent,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

/// Descriptive statistics of the consolidated field.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FieldStats {
    pub column: String,
    pub rows: usize,
    pub non_missing: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    /// Sample standard deviation; needs at least two values.
    pub std_dev: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MergeSummary {
    pub left_rows: usize,
    pub right_rows: usize,
    pub merged_rows: usize,
    /// Empty when the tables were concatenated.
    pub join_keys: Vec<String>,
    pub provenance: ProvenanceCounts,
    pub left_normalize: NormalizeStats,
    pub right_normalize: NormalizeStats,
    pub consolidation: Consolidation,
    pub field: FieldStats,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub table: Table,
    pub summary: MergeSummary,
}
