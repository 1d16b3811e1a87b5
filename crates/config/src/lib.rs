// Configuration loading

pub mod settings;

pub use settings::{
    ConfigError, FieldConfig, JoinConfig, PipelineConfig, SourcesConfig, SplitConfig,
    DEFAULT_CONFIG_TOML,
};
