// File I/O operations

pub mod csv;
pub mod error;
pub mod split;

pub use error::{LoadError, SplitError, WriteError};
