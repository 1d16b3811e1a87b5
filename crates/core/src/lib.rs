//! `immofuse-core`: in-memory tables and run diagnostics shared by every stage.

pub mod diagnostics;
pub mod table;

pub use diagnostics::{Diagnostic, Diagnostics, Side, Stage};
pub use table::{Column, ColumnType, Table, Value};
