// CSV import/export for source tables and the consolidated output

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use immofuse_core::Table;
use serde::Serialize;

use crate::error::{LoadError, WriteError};

/// Load a whole CSV file. Every column is classified once while building the table.
pub fn load_table(path: &Path) -> Result<Table, LoadError> {
    let content = read_file_as_utf8(path)?;
    let (headers, rows) = parse_records(&content, path, None)?;
    log::info!("loaded {} rows x {} columns from {}", rows.len(), headers.len(), path.display());
    Ok(Table::from_raw_rows(headers, &rows))
}

/// Load a CSV file keeping only the data records whose raw text starts with `marker`.
///
/// The test runs on the record's bytes as written in the file, so a quoted
/// first field (`"POINT ...`) does not match `POINT`. Zero matches give a
/// header-only table.
pub fn load_filtered(path: &Path, marker: &str) -> Result<Table, LoadError> {
    let content = read_file_as_utf8(path)?;
    let (headers, rows) = parse_records(&content, path, Some(marker))?;
    log::info!(
        "kept {} rows starting with '{marker}' from {}",
        rows.len(),
        path.display()
    );
    Ok(Table::from_raw_rows(headers, &rows))
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, LoadError> {
    let io_err = |source| LoadError::Io { path: path.to_path_buf(), source };
    let mut file = File::open(path).map_err(io_err)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(io_err)?;

    // Try UTF-8 first; on failure, recover the buffer from the error
    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            // Fall back to Windows-1252 (common for Excel-exported CSVs)
            log::debug!("{} is not UTF-8, decoding as Windows-1252", path.display());
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

/// Split content into header names and raw data rows.
fn parse_records(
    content: &str,
    path: &Path,
    marker: Option<&str>,
) -> Result<(Vec<String>, Vec<Vec<String>>), LoadError> {
    let csv_err = |source| LoadError::Csv { path: path.to_path_buf(), source };
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    // Rows may be ragged; Table pads short ones and drops overflow.
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());
    let headers = read_header(&mut reader, path)?;

    let bytes = content.as_bytes();
    let mut record = StringRecord::new();
    let mut rows = Vec::new();
    while reader.read_record(&mut record).map_err(csv_err)? {
        if let Some(marker) = marker {
            let start = record.position().map(|p| p.byte() as usize).unwrap_or(0);
            if !raw_starts_with(bytes, start, marker.as_bytes()) {
                continue;
            }
        }
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok((headers, rows))
}

/// First record as trimmed, de-duplicated column names.
fn read_header<R: Read>(reader: &mut csv::Reader<R>, path: &Path) -> Result<Vec<String>, LoadError> {
    let mut record = StringRecord::new();
    let found = reader
        .read_record(&mut record)
        .map_err(|source| LoadError::Csv { path: path.to_path_buf(), source })?;
    if !found || is_blank(&record) {
        return Err(LoadError::MissingHeader { path: path.to_path_buf() });
    }
    Ok(dedupe_headers(record.iter().map(|h| h.trim().to_string()).collect()))
}

/// Whether the record text at `start` begins with `marker`.
///
/// A record's position can point at the line terminator left over from the
/// previous record (`\n` after `\r`) or at skipped blank lines, so those
/// bytes are passed over first.
fn raw_starts_with(bytes: &[u8], start: usize, marker: &[u8]) -> bool {
    let raw = bytes.get(start..).unwrap_or_default();
    let first = raw
        .iter()
        .position(|b| !matches!(b, b'\r' | b'\n'))
        .unwrap_or(raw.len());
    raw[first..].starts_with(marker)
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|f| f.trim().is_empty())
}

/// Make header names unique: repeats become `name.1`, `name.2`, ...
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(headers.len());
    for name in headers {
        if !out.contains(&name) {
            out.push(name);
            continue;
        }
        let mut n = 1;
        while out.contains(&format!("{name}.{n}")) {
            n += 1;
        }
        out.push(format!("{name}.{n}"));
    }
    out
}

// ---------------------------------------------------------------------------
// Header inspection
// ---------------------------------------------------------------------------

/// Shape of a source file's header line.
#[derive(Debug, Clone, Serialize)]
pub struct HeaderReport {
    pub path: String,
    pub column_count: usize,
    /// Column names exactly as a load would produce them.
    pub columns: Vec<String>,
}

/// Read the header line of `path` with the same decoding and cleanup as a load.
pub fn inspect_headers(path: &Path) -> Result<HeaderReport, LoadError> {
    let content = read_file_as_utf8(path)?;
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());
    let columns = read_header(&mut reader, path)?;

    Ok(HeaderReport {
        path: path.display().to_string(),
        column_count: columns.len(),
        columns,
    })
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Write `table` as comma-delimited UTF-8 CSV, overwriting `path`.
///
/// The parent directory must already exist. Missing cells are written empty.
pub fn write_table(table: &Table, path: &Path) -> Result<(), WriteError> {
    let csv_err = |source| WriteError::Csv { path: path.to_path_buf(), source };
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b',')
        .from_path(path)
        .map_err(csv_err)?;

    writer.write_record(table.column_names()).map_err(csv_err)?;
    for row in table.rendered_rows() {
        writer
            .write_record(row.iter().map(|c| c.as_bytes()))
            .map_err(csv_err)?;
    }

    writer
        .flush()
        .map_err(|source| WriteError::Io { path: path.to_path_buf(), source })?;
    log::info!("wrote {} rows to {}", table.row_count(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    use immofuse_core::{ColumnType, Value};

    #[test]
    fn filtered_load_keeps_marker_rows_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bnb.csv");
        fs::write(
            &path,
            "geom,Identifiant_BAN,surface\n\
             POINT (1 2),ban1,45\n\
             LINESTRING (1 2 3 4),ban2,50\n\
             POINT (5 6),ban3,60\n\
             ,ban4,70\n",
        )
        .unwrap();

        let table = load_filtered(&path, "POINT").unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_names(), vec!["geom", "Identifiant_BAN", "surface"]);
        let ban = &table.column("Identifiant_BAN").unwrap().values;
        assert_eq!(ban, &vec![Value::Text("ban1".into()), Value::Text("ban3".into())]);
        assert_eq!(table.column("surface").unwrap().kind, ColumnType::Number);
    }

    #[test]
    fn quoted_marker_field_does_not_match_raw_prefix() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bnb.csv");
        fs::write(&path, "geom,id\n\"POINT (1, 2)\",a\nPOINT (3 4),b\n").unwrap();

        let table = load_filtered(&path, "POINT").unwrap();
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.column("id").unwrap().values[0], Value::Text("b".into()));
    }

    #[test]
    fn crlf_records_keep_marker_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bnb.csv");
        fs::write(
            &path,
            "geom,id\r\nPOINT (1 2),a\r\nLINESTRING (0 0),x\r\nPOINT (3 4),b\r\nPOINT (5 6),c\r\n",
        )
        .unwrap();

        let table = load_filtered(&path, "POINT").unwrap();
        assert_eq!(table.row_count(), 3);
        let ids = &table.column("id").unwrap().values;
        assert_eq!(ids, &vec![Value::Text("a".into()), Value::Text("b".into()), Value::Text("c".into())]);
    }

    #[test]
    fn blank_line_between_records_is_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bnb.csv");
        fs::write(&path, "geom,id\nPOINT (1 2),a\n\nPOINT (3 4),b\n\r\n\r\nPOINT (5 6),c\n").unwrap();

        let table = load_filtered(&path, "POINT").unwrap();
        assert_eq!(table.row_count(), 3);
    }

    #[test]
    fn marker_check_skips_leading_terminators() {
        let bytes = b"a\r\nPOINT";
        assert!(raw_starts_with(bytes, 2, b"POINT"));
        assert!(raw_starts_with(bytes, 3, b"POINT"));
        assert!(!raw_starts_with(bytes, 0, b"POINT"));
        assert!(!raw_starts_with(bytes, 99, b"POINT"));
    }

    #[test]
    fn filtered_load_with_no_match_is_header_only() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bnb.csv");
        fs::write(&path, "geom,id\nPOLYGON ((0 0)),a\n").unwrap();

        let table = load_filtered(&path, "POINT").unwrap();
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.column_names(), vec!["geom", "id"]);
    }

    #[test]
    fn empty_file_has_no_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        fs::write(&path, "").unwrap();

        let err = load_table(&path).unwrap_err();
        assert!(matches!(err, LoadError::MissingHeader { .. }));
        assert!(err.is_format());
    }

    #[test]
    fn unreadable_path_is_io_error() {
        let dir = tempdir().unwrap();
        let err = load_filtered(&dir.path().join("absent.csv"), "POINT").unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
        assert!(!err.is_format());
    }

    #[test]
    fn windows_1252_input_is_decoded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ademe.csv");
        // "id,libellé" with é as 0xE9
        let mut bytes = b"id,libell".to_vec();
        bytes.push(0xE9);
        bytes.extend_from_slice(b"\n1,x\n");
        fs::write(&path, bytes).unwrap();

        let table = load_table(&path).unwrap();
        assert_eq!(table.column_names(), vec!["id", "libellé"]);
    }

    #[test]
    fn mixed_column_is_text_and_nulls_are_missing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ademe.csv");
        fs::write(&path, "code,surface\n75001,45\n2A004,NaN\n").unwrap();

        let table = load_table(&path).unwrap();
        assert_eq!(table.column("code").unwrap().kind, ColumnType::Text);
        let surface = &table.column("surface").unwrap().values;
        assert_eq!(surface, &vec![Value::Number(45.0), Value::Missing]);
    }

    #[test]
    fn utf8_bom_is_not_part_of_first_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bnb.csv");
        fs::write(&path, "\u{feff}geom,id\nPOINT (1 2),a\n").unwrap();

        let table = load_filtered(&path, "POINT").unwrap();
        assert_eq!(table.column_names(), vec!["geom", "id"]);
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn duplicate_headers_are_renamed() {
        assert_eq!(
            dedupe_headers(vec!["a".into(), "b".into(), "a".into(), "a".into()]),
            vec!["a", "b", "a.1", "a.2"]
        );
    }

    #[test]
    fn inspect_matches_loaded_headers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bnb.csv");
        fs::write(&path, "\u{feff}geom, surface ,geom\nPOINT (1 2),45,a\n").unwrap();

        let report = inspect_headers(&path).unwrap();
        let table = load_table(&path).unwrap();
        assert_eq!(report.column_count, 3);
        assert_eq!(report.columns, vec!["geom", "surface", "geom.1"]);
        assert_eq!(report.columns, table.column_names());
    }

    #[test]
    fn inspect_decodes_windows_1252_headers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ademe.csv");
        let mut bytes = b"id,libell".to_vec();
        bytes.push(0xE9);
        bytes.extend_from_slice(b"\n1,x\n");
        fs::write(&path, bytes).unwrap();

        let report = inspect_headers(&path).unwrap();
        assert_eq!(report.columns, vec!["id", "libellé"]);
    }

    #[test]
    fn inspect_empty_file_has_no_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        fs::write(&path, "").unwrap();
        assert!(matches!(inspect_headers(&path), Err(LoadError::MissingHeader { .. })));
    }

    #[test]
    fn write_renders_missing_as_empty() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("in.csv");
        fs::write(&src, "id,label,surface\na,\"x, y\",45.5\nb,,\n").unwrap();
        let table = load_table(&src).unwrap();

        let out = dir.path().join("out.csv");
        write_table(&table, &out).unwrap();
        let content = fs::read_to_string(&out).unwrap();
        assert_eq!(content, "id,label,surface\na,\"x, y\",45.5\nb,,\n");
    }

    #[test]
    fn write_overwrites_existing_file() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out.csv");
        fs::write(&out, "stale content that is longer than the new one\n").unwrap();

        write_table(&Table::with_headers(["a"]), &out).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "a\n");
    }

    #[test]
    fn write_into_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("nope").join("out.csv");
        assert!(write_table(&Table::with_headers(["a"]), &out).is_err());
    }
}
