// Pipeline settings
// Loaded from a TOML file; every key is optional and falls back to the defaults below.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Input and output locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourcesConfig {
    /// Building registry export (source A). Only marker rows are kept.
    pub left: PathBuf,
    /// Energy-performance export (source B). Loaded in full.
    pub right: PathBuf,
    /// Raw-text prefix a left record must start with to be kept.
    pub left_row_prefix: String,
    /// Destination of the consolidated CSV, overwritten on every run.
    pub output: PathBuf,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            left: PathBuf::from("Test.xlsx - BNB.csv"),
            right: PathBuf::from("Test.xlsx - Ademe.csv"),
            left_row_prefix: "POINT".to_string(),
            output: PathBuf::from("df_consolide.csv"),
        }
    }
}

/// The numeric field that gets normalized and consolidated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldConfig {
    pub name: String,
    /// Values below this are rejected. The bound itself is accepted.
    pub min: f64,
    /// Values above this are rejected. The bound itself is accepted.
    pub max: f64,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            name: "Surface_habitable_logement".to_string(),
            min: 5.0,
            max: 1000.0,
        }
    }
}

impl FieldConfig {
    /// True if `v` lies within `[min, max]`.
    pub fn accepts(&self, v: f64) -> bool {
        !(v < self.min || v > self.max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JoinConfig {
    /// Preferred join columns, in priority order.
    pub priority_keys: Vec<String>,
    /// Prefix applied to the left table's non-key columns.
    pub left_prefix: String,
    /// Prefix applied to the right table's non-key columns.
    pub right_prefix: String,
    /// Name of the per-row provenance column.
    pub provenance_column: String,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            priority_keys: vec![
                "Identifiant_BAN".to_string(),
                "libelle_adresse".to_string(),
                "code_postal".to_string(),
                "code_commune_insee".to_string(),
            ],
            left_prefix: "bnb_".to_string(),
            right_prefix: "ademe_".to_string(),
            provenance_column: "_merge".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SplitConfig {
    /// Output files are named `{prefix}{n}.csv`, n starting at 1.
    pub prefix: String,
    /// Data rows per file, header excluded.
    pub max_lines_per_file: usize,
    /// Files beyond this count are never created.
    pub max_files: usize,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            prefix: "split_".to_string(),
            max_lines_per_file: 3000,
            max_files: 5,
        }
    }
}

impl SplitConfig {
    /// Total data rows the configured files can hold.
    pub fn capacity(&self) -> u64 {
        self.max_lines_per_file as u64 * self.max_files as u64
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_lines_per_file == 0 {
            return Err(ConfigError::Validation(
                "split.max_lines_per_file must be at least 1".into(),
            ));
        }
        if self.prefix.is_empty() {
            return Err(ConfigError::Validation("split.prefix must not be empty".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub sources: SourcesConfig,
    pub field: FieldConfig,
    pub join: JoinConfig,
    pub split: SplitConfig,
}

/// Commented template matching `PipelineConfig::default()`.
pub const DEFAULT_CONFIG_TOML: &str = r#"# immofuse pipeline configuration

[sources]
# Building registry; only records starting with left_row_prefix are kept
left = "Test.xlsx - BNB.csv"
right = "Test.xlsx - Ademe.csv"
left_row_prefix = "POINT"
output = "df_consolide.csv"

[field]
name = "Surface_habitable_logement"
# Plausibility range, bounds accepted
min = 5.0
max = 1000.0

[join]
priority_keys = ["Identifiant_BAN", "libelle_adresse", "code_postal", "code_commune_insee"]
left_prefix = "bnb_"
right_prefix = "ademe_"
provenance_column = "_merge"

[split]
prefix = "split_"
max_lines_per_file = 3000
max_files = 5
"#;

impl PipelineConfig {
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let field = &self.field;
        if field.name.trim().is_empty() {
            return Err(ConfigError::Validation("field.name must not be empty".into()));
        }
        if !field.min.is_finite() || !field.max.is_finite() {
            return Err(ConfigError::Validation("field bounds must be finite".into()));
        }
        if field.min > field.max {
            return Err(ConfigError::Validation(format!(
                "field.min ({}) is greater than field.max ({})",
                field.min, field.max
            )));
        }

        let join = &self.join;
        if join.left_prefix.is_empty() || join.right_prefix.is_empty() {
            return Err(ConfigError::Validation("join prefixes must not be empty".into()));
        }
        if join.left_prefix.eq_ignore_ascii_case(&join.right_prefix) {
            return Err(ConfigError::Validation(format!(
                "join prefixes must differ, both are '{}'",
                join.left_prefix
            )));
        }
        if join.provenance_column.is_empty() {
            return Err(ConfigError::Validation("join.provenance_column must not be empty".into()));
        }

        self.split.validate()
    }
}
