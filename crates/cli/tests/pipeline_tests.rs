// End-to-end pipeline tests over the sample exports in tests/fixtures.
// Run with: cargo test -p immofuse-cli --test pipeline_tests

use std::fs;
use std::path::{Path, PathBuf};

use immofuse_cli::pipeline::{inspect_sources, run_pipeline, PipelineError};
use immofuse_config::PipelineConfig;
use immofuse_core::Diagnostic;
use immofuse_io::LoadError;
use tempfile::tempdir;

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn config_with_output(output: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.sources.left = fixtures_dir().join("bnb_sample.csv");
    config.sources.right = fixtures_dir().join("ademe_sample.csv");
    config.sources.output = output.to_path_buf();
    config
}

/// Output rows as header-keyed lookups. Fixture cells contain no commas.
fn read_output(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let content = fs::read_to_string(path).unwrap();
    let mut lines = content.lines();
    let header = lines.next().unwrap().split(',').map(str::to_string).collect();
    let rows = lines.map(|l| l.split(',').map(str::to_string).collect()).collect();
    (header, rows)
}

fn cell<'a>(header: &[String], row: &'a [String], column: &str) -> &'a str {
    let idx = header.iter().position(|h| h == column).unwrap();
    &row[idx]
}

#[test]
fn sample_run_matches_expected_merge() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("df_consolide.csv");

    let report = run_pipeline(&config_with_output(&output)).unwrap();
    let s = &report.summary;

    // LINESTRING and MULTIPOLYGON rows are filtered out
    assert_eq!(s.left_rows, 5);
    assert_eq!(s.right_rows, 5);
    assert_eq!(s.join_keys, vec!["Identifiant_BAN", "code_postal"]);
    assert_eq!(s.merged_rows, 7);
    assert_eq!(s.provenance.both, 3);
    assert_eq!(s.provenance.left_only, 2);
    assert_eq!(s.provenance.right_only, 2);

    // 45, "78,5" kept; coordinates, "O" and 1500 rejected
    assert_eq!(s.left_normalize.valid, 2);
    assert_eq!(s.left_normalize.coordinates, 1);
    assert_eq!(s.left_normalize.no_digits, 1);
    assert_eq!(s.left_normalize.out_of_range, 1);
    // 52, 64.2, abc123m2 kept; 3 rejected
    assert_eq!(s.right_normalize.valid, 3);
    assert_eq!(s.right_normalize.digit_fallback, 1);
    assert_eq!(s.right_normalize.out_of_range, 1);

    assert_eq!(s.field.non_missing, 4);
    assert_eq!(s.field.min, Some(52.0));
    assert_eq!(s.field.max, Some(123.0));
    assert!((s.field.mean.unwrap() - 79.425).abs() < 1e-9);
    assert!(s.diagnostics.is_empty());

    let (header, rows) = read_output(&output);
    assert_eq!(
        header,
        vec![
            "bnb_geom_groupe",
            "Identifiant_BAN",
            "code_postal",
            "bnb_Surface_habitable_logement",
            "bnb_annee_construction",
            "ademe_Etiquette_DPE",
            "ademe_Surface_habitable_logement",
            "_merge",
            "Surface_habitable_logement",
        ]
    );

    let ids: Vec<&str> = rows.iter().map(|r| cell(&header, r, "Identifiant_BAN")).collect();
    assert_eq!(ids, vec!["ban_001", "ban_002", "ban_004", "ban_005", "ban_007", "ban_009", "ban_010"]);

    let surface: Vec<&str> = rows
        .iter()
        .map(|r| cell(&header, r, "Surface_habitable_logement"))
        .collect();
    // right wins for ban_001, left fills ban_002, right-only ban_010 via digit fallback
    assert_eq!(surface, vec!["52", "78.5", "64.2", "", "", "", "123"]);

    let merge: Vec<&str> = rows.iter().map(|r| cell(&header, r, "_merge")).collect();
    assert_eq!(
        merge,
        vec!["both", "both", "both", "left_only", "left_only", "right_only", "right_only"]
    );

    // keys of right-only rows come from the right table
    assert_eq!(cell(&header, &rows[5], "code_postal"), "75015");
    assert_eq!(cell(&header, &rows[5], "bnb_geom_groupe"), "");
}

#[test]
fn report_serializes_flat() {
    let dir = tempdir().unwrap();
    let report = run_pipeline(&config_with_output(&dir.path().join("out.csv"))).unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["merged_rows"], 7);
    assert_eq!(json["join_keys"][0], "Identifiant_BAN");
    assert_eq!(json["consolidation"]["source"], "coalesced");
    assert_eq!(json["diagnostics"], serde_json::json!([]));
}

#[test]
fn missing_right_source_is_a_load_error() {
    let dir = tempdir().unwrap();
    let mut config = config_with_output(&dir.path().join("out.csv"));
    config.sources.right = dir.path().join("absent.csv");

    let err = run_pipeline(&config).unwrap_err();
    assert!(matches!(err, PipelineError::Load(LoadError::Io { .. })));
    assert!(!dir.path().join("out.csv").exists());
}

#[test]
fn invalid_config_is_rejected_before_loading() {
    let dir = tempdir().unwrap();
    let mut config = config_with_output(&dir.path().join("out.csv"));
    config.field.min = 2000.0;

    assert!(matches!(run_pipeline(&config), Err(PipelineError::Config(_))));
}

#[test]
fn no_marker_rows_gives_right_only_output() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("out.csv");
    let mut config = config_with_output(&output);
    config.sources.left_row_prefix = "NOPE".to_string();

    let report = run_pipeline(&config).unwrap();
    assert_eq!(report.summary.left_rows, 0);
    assert_eq!(report.summary.provenance.right_only, 5);
    assert_eq!(report.summary.merged_rows, 5);
}

#[test]
fn absent_field_is_diagnosed_not_fatal() {
    let dir = tempdir().unwrap();
    let left = dir.path().join("left.csv");
    let right = dir.path().join("right.csv");
    fs::write(&left, "geom,Identifiant_BAN\nPOINT (1 2),a\n").unwrap();
    fs::write(&right, "Identifiant_BAN,etiquette\na,C\n").unwrap();

    let mut config = config_with_output(&dir.path().join("out.csv"));
    config.sources.left = left;
    config.sources.right = right;

    let report = run_pipeline(&config).unwrap();
    let missing = report
        .summary
        .diagnostics
        .iter()
        .filter(|d| matches!(d, Diagnostic::MissingColumn { .. }))
        .count();
    assert_eq!(missing, 2);
    assert_eq!(report.summary.field.non_missing, 0);
}

#[test]
fn rerun_overwrites_output() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("out.csv");
    let config = config_with_output(&output);

    run_pipeline(&config).unwrap();
    let first = fs::read_to_string(&output).unwrap();
    run_pipeline(&config).unwrap();
    assert_eq!(fs::read_to_string(&output).unwrap(), first);
}

#[test]
fn inspect_previews_join_keys() {
    let dir = tempdir().unwrap();
    let report = inspect_sources(&config_with_output(&dir.path().join("out.csv"))).unwrap();

    assert_eq!(report.left.headers.column_count, 5);
    assert_eq!(report.left.field_position, Some(3));
    assert_eq!(report.right.field_position, Some(3));
    assert_eq!(report.join_keys, vec!["Identifiant_BAN", "code_postal"]);
    assert!(report.diagnostics.is_empty());
}

#[test]
fn inspect_agrees_with_run_on_field_column_and_keys() {
    let dir = tempdir().unwrap();
    let left = dir.path().join("left.csv");
    let right = dir.path().join("right.csv");
    // BOM before the key, field matched by substring on the left
    fs::write(
        &left,
        "\u{feff}Identifiant_BAN,geom,surface_habitable_logement_bnb\nPOINT (1 2),x,45\n",
    )
    .unwrap();
    fs::write(&right, "Identifiant_BAN,Surface_habitable_logement\nPOINT (1 2),52\n").unwrap();

    let mut config = config_with_output(&dir.path().join("out.csv"));
    config.sources.left = left;
    config.sources.right = right;

    let inspect = inspect_sources(&config).unwrap();
    assert_eq!(inspect.left.headers.columns[0], "Identifiant_BAN");
    assert_eq!(
        inspect.left.field_column.as_deref(),
        Some("surface_habitable_logement_bnb")
    );
    assert_eq!(inspect.left.field_position, Some(2));

    let run = run_pipeline(&config).unwrap();
    assert_eq!(inspect.join_keys, run.summary.join_keys);
    assert_eq!(run.summary.left_normalize.column, "surface_habitable_logement_bnb");
}

#[test]
fn inspect_reports_absent_field() {
    let dir = tempdir().unwrap();
    let left = dir.path().join("left.csv");
    let right = dir.path().join("right.csv");
    fs::write(&left, "geom,Identifiant_BAN\nPOINT (1 2),a\n").unwrap();
    fs::write(&right, "Identifiant_BAN,etiquette\na,C\n").unwrap();

    let mut config = config_with_output(&dir.path().join("out.csv"));
    config.sources.left = left;
    config.sources.right = right;

    let inspect = inspect_sources(&config).unwrap();
    assert_eq!(inspect.left.field_column, None);
    assert_eq!(inspect.right.field_position, None);
    let run = run_pipeline(&config).unwrap();
    assert_eq!(inspect.join_keys, run.summary.join_keys);
    assert_eq!(inspect.diagnostics.len(), 2);
}
