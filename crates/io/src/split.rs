//! Record-aware CSV splitting into a bounded number of files.
//!
//! Every output file repeats the header. Records are parsed and re-written
//! with the `csv` crate, so quoted fields with embedded separators or
//! newlines never straddle two files.

use std::fs::File;
use std::path::{Path, PathBuf};

use csv::{ByteRecord, ReaderBuilder, Writer, WriterBuilder};
use immofuse_config::SplitConfig;
use immofuse_core::{Diagnostic, Diagnostics};
use serde::Serialize;

use crate::error::{SplitError, WriteError};

/// Result of splitting one CSV file.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SplitOutcome {
    /// Files created, in order.
    pub chunk_paths: Vec<PathBuf>,
    /// Data rows in each file (parallel to `chunk_paths`).
    pub rows_per_chunk: Vec<u64>,
    pub rows_written: u64,
    /// Rows read after the file limit was reached.
    pub discarded_rows: u64,
    pub diagnostics: Diagnostics,
}

/// Output path of the `n`th chunk (1-based).
pub fn chunk_path(prefix: &str, n: usize) -> PathBuf {
    PathBuf::from(format!("{prefix}{n}.csv"))
}

/// Split `source` into `{prefix}1.csv`, `{prefix}2.csv`, ...
///
/// A file is only created once it has a data row to hold, and it is flushed
/// and closed before the next one is opened. Rows beyond
/// `max_files * max_lines_per_file` are counted and dropped.
pub fn split_file(source: &Path, config: &SplitConfig) -> Result<SplitOutcome, SplitError> {
    let read_err = |source_err| SplitError::Read { path: source.to_path_buf(), source: source_err };

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(source)
        .map_err(read_err)?;

    let mut outcome = SplitOutcome::default();

    let mut header = ByteRecord::new();
    if !reader.read_byte_record(&mut header).map_err(read_err)? {
        outcome.diagnostics.push(Diagnostic::EmptyInput {
            path: source.display().to_string(),
        });
        return Ok(outcome);
    }

    let limit = config.max_lines_per_file as u64;
    log::debug!(
        "splitting {} into at most {} file(s), {} row(s) total",
        source.display(),
        config.max_files,
        config.capacity()
    );
    let mut current: Option<ChunkWriter> = None;
    let mut record = ByteRecord::new();

    while reader.read_byte_record(&mut record).map_err(read_err)? {
        if current.is_none() {
            if outcome.chunk_paths.len() >= config.max_files {
                outcome.discarded_rows += 1;
                continue;
            }
            let path = chunk_path(&config.prefix, outcome.chunk_paths.len() + 1);
            log::info!("creating {}", path.display());
            let writer = ChunkWriter::create(&path, &header)?;
            outcome.chunk_paths.push(path);
            current = Some(writer);
        }

        let full = match current.as_mut() {
            Some(writer) => {
                writer.write(&record)?;
                outcome.rows_written += 1;
                writer.rows >= limit
            }
            None => false,
        };

        if full {
            if let Some(writer) = current.take() {
                outcome.rows_per_chunk.push(writer.finish()?);
            }
        }
    }

    if let Some(writer) = current.take() {
        outcome.rows_per_chunk.push(writer.finish()?);
    }

    if outcome.discarded_rows > 0 {
        outcome.diagnostics.push(Diagnostic::SplitTruncated {
            max_files: config.max_files,
            discarded_rows: outcome.discarded_rows,
        });
    }

    log::info!(
        "split {} into {} file(s), {} row(s) written",
        source.display(),
        outcome.chunk_paths.len(),
        outcome.rows_written
    );
    Ok(outcome)
}

/// One open chunk file.
struct ChunkWriter {
    path: PathBuf,
    writer: Writer<File>,
    rows: u64,
}

impl ChunkWriter {
    fn create(path: &Path, header: &ByteRecord) -> Result<Self, WriteError> {
        let mut writer = WriterBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|source| WriteError::Csv { path: path.to_path_buf(), source })?;
        writer
            .write_byte_record(header)
            .map_err(|source| WriteError::Csv { path: path.to_path_buf(), source })?;
        Ok(Self { path: path.to_path_buf(), writer, rows: 0 })
    }

    fn write(&mut self, record: &ByteRecord) -> Result<(), WriteError> {
        self.writer
            .write_byte_record(record)
            .map_err(|source| WriteError::Csv { path: self.path.clone(), source })?;
        self.rows += 1;
        Ok(())
    }

    /// Flush and close, returning the number of data rows written.
    fn finish(mut self) -> Result<u64, WriteError> {
        self.writer
            .flush()
            .map_err(|source| WriteError::Io { path: self.path.clone(), source })?;
        log::debug!("closed {} with {} row(s)", self.path.display(), self.rows);
        Ok(self.rows)
    }
}
