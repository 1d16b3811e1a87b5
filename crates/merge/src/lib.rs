//! `immofuse-merge`: normalize, join and consolidate two real-estate tables.
//!
//! Pure engine crate: receives loaded tables, returns the consolidated table
//! plus a run summary. No CLI or IO dependencies.

pub mod consolidate;
pub mod engine;
pub mod join;
pub mod keys;
pub mod model;
pub mod normalize;
pub mod stats;

pub use engine::run;
pub use model::{MergeOutcome, MergeSummary, Provenance};
