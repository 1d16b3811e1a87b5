use std::path::PathBuf;

use thiserror::Error;

/// Failure to read a source table. Always fatal for the run.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path} has no header line")]
    MissingHeader { path: PathBuf },
}

impl LoadError {
    /// True for structural problems with the file's content, as opposed to access failures.
    pub fn is_format(&self) -> bool {
        matches!(self, LoadError::Csv { .. } | LoadError::MissingHeader { .. })
    }
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("cannot write {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum SplitError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error(transparent)]
    Write(#[from] WriteError),
}
