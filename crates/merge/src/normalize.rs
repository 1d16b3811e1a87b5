// Surface-area normalization.
// Turns messy text (decimal commas, units, geometry strings) into a number or missing.

use std::sync::OnceLock;

use immofuse_config::FieldConfig;
use immofuse_core::{Column, ColumnType, Diagnostic, Diagnostics, Side, Stage, Table, Value};
use regex::Regex;

use crate::model::{NormalizeOutcome, NormalizeStats};

fn coordinate_pair_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+\.\d+\s+\d+\.\d+").expect("static regex"))
}

fn digit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d").expect("static regex"))
}

fn digit_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+\.?\d*").expect("static regex"))
}

/// Parse a raw string into a candidate number, before any range check.
///
/// Steps run in a fixed order; each later step is a more permissive
/// fallback for the earlier ones.
pub fn parse_messy_number(raw: &str) -> (Option<f64>, NormalizeOutcome) {
    let trimmed = raw.trim();

    if coordinate_pair_re().is_match(trimmed) {
        return (None, NormalizeOutcome::Coordinates);
    }

    let cleaned = trimmed.replace(',', ".");

    // "O" is a data-entry artifact for 0 or blank
    if cleaned.eq_ignore_ascii_case("o") || !digit_re().is_match(&cleaned) {
        return (None, NormalizeOutcome::NoDigits);
    }

    if let Ok(v) = cleaned.parse::<f64>() {
        return (Some(v), NormalizeOutcome::Parsed);
    }

    // Only the first run counts: "12-34" gives 12.
    match digit_run_re().find(&cleaned).and_then(|m| m.as_str().parse::<f64>().ok()) {
        Some(v) => (Some(v), NormalizeOutcome::DigitFallback),
        None => (None, NormalizeOutcome::Unparsable),
    }
}

/// Normalize one cell against the field's plausibility range.
pub fn normalize_value(value: &Value, field: &FieldConfig) -> (Value, NormalizeOutcome) {
    let (candidate, outcome) = match value {
        Value::Missing => return (Value::Missing, NormalizeOutcome::InputMissing),
        Value::Number(n) => (Some(*n), NormalizeOutcome::Passthrough),
        Value::Text(s) => parse_messy_number(s),
    };

    match candidate {
        Some(v) if v.is_finite() && field.accepts(v) => (Value::Number(v), outcome),
        Some(_) => (Value::Missing, NormalizeOutcome::OutOfRange),
        None => (Value::Missing, outcome),
    }
}

/// Find the column holding the field: exact name first, then the first
/// column whose name contains the field name, ignoring case.
pub fn resolve_field_column(table: &Table, field_name: &str) -> Option<String> {
    if table.has_column(field_name) {
        return Some(field_name.to_string());
    }
    let needle = field_name.to_lowercase();
    table
        .column_names()
        .into_iter()
        .find(|name| name.to_lowercase().contains(&needle))
        .map(str::to_string)
}

/// Normalize the field's column on `table`, returning the new table and its stats.
///
/// An absent column is created all-missing under the field's name and a
/// `MissingColumn` diagnostic is recorded.
pub fn normalize_table(
    table: Table,
    field: &FieldConfig,
    side: Side,
    diagnostics: &mut Diagnostics,
) -> (Table, NormalizeStats) {
    let Some(name) = resolve_field_column(&table, &field.name) else {
        diagnostics.push(Diagnostic::MissingColumn {
            stage: Stage::Normalize,
            side,
            column: field.name.clone(),
        });
        let rows = table.row_count();
        let stats = NormalizeStats {
            column: field.name.clone(),
            found: false,
            ..NormalizeStats::default()
        };
        return (table.with_column(Column::missing(field.name.clone(), rows)), stats);
    };

    let mut stats = NormalizeStats {
        column: name.clone(),
        found: true,
        ..NormalizeStats::default()
    };

    let source = table.column(&name).map(|c| c.values.as_slice()).unwrap_or(&[]);
    let values: Vec<Value> = source
        .iter()
        .map(|v| {
            let (out, outcome) = normalize_value(v, field);
            stats.record(outcome, !out.is_missing());
            out
        })
        .collect();

    log::debug!(
        "{side}: normalized '{name}': {} valid, {} digit fallbacks, {} rejected",
        stats.valid,
        stats.digit_fallback,
        stats.rejected()
    );

    let kind = if stats.valid > 0 { ColumnType::Number } else { ColumnType::Empty };
    let column = Column { name, kind, values };
    (table.with_column(column), stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field() -> FieldConfig {
        FieldConfig::default()
    }

    fn norm(s: &str) -> Value {
        normalize_value(&Value::Text(s.into()), &field()).0
    }

    #[test]
    fn decimal_comma() {
        assert_eq!(norm("45,5"), Value::Number(45.5));
    }

    #[test]
    fn coordinate_pair_is_missing() {
        assert_eq!(norm("48.3 2.35"), Value::Missing);
        let (_, outcome) = parse_messy_number("POINT (652311.12 6862045.87)");
        assert_eq!(outcome, NormalizeOutcome::Coordinates);
    }

    #[test]
    fn letter_o_artifact() {
        assert_eq!(norm("O"), Value::Missing);
        assert_eq!(norm("o"), Value::Missing);
        assert_eq!(normalize_value(&Value::Text("O".into()), &field()).1, NormalizeOutcome::NoDigits);
    }

    #[test]
    fn no_digits() {
        assert_eq!(norm("inconnu"), Value::Missing);
        assert_eq!(norm("   "), Value::Missing);
    }

    #[test]
    fn digit_run_fallback() {
        let (v, outcome) = normalize_value(&Value::Text("abc123m2".into()), &field());
        assert_eq!(v, Value::Number(123.0));
        assert_eq!(outcome, NormalizeOutcome::DigitFallback);
        assert_eq!(norm("85.5 m²"), Value::Number(85.5));
    }

    #[test]
    fn first_digit_run_only() {
        assert_eq!(norm("12-34"), Value::Number(12.0));
        assert_eq!(norm("120 / 340"), Value::Number(120.0));
    }

    #[test]
    fn range_rejections() {
        assert_eq!(norm("3"), Value::Missing);
        assert_eq!(norm("1500"), Value::Missing);
        assert_eq!(normalize_value(&Value::Text("1500".into()), &field()).1, NormalizeOutcome::OutOfRange);
    }

    #[test]
    fn bounds_are_accepted() {
        assert_eq!(norm("5"), Value::Number(5.0));
        assert_eq!(norm("1000"), Value::Number(1000.0));
        assert_eq!(norm("4.99"), Value::Missing);
        assert_eq!(norm("1000.01"), Value::Missing);
    }

    #[test]
    fn numbers_pass_through_but_are_range_checked() {
        let f = field();
        assert_eq!(normalize_value(&Value::Number(78.0), &f).0, Value::Number(78.0));
        assert_eq!(normalize_value(&Value::Number(2.0), &f).0, Value::Missing);
        assert_eq!(normalize_value(&Value::Missing, &f).1, NormalizeOutcome::InputMissing);
    }

    #[test]
    fn huge_exponent_is_out_of_range() {
        assert_eq!(norm("1e400"), Value::Missing);
    }

    #[test]
    fn resolve_prefers_exact_then_substring() {
        let t = Table::from_raw_rows(
            vec!["id".into(), "surface_habitable_logement_m2".into()],
            &[],
        );
        assert_eq!(
            resolve_field_column(&t, "Surface_habitable_logement").as_deref(),
            Some("surface_habitable_logement_m2")
        );
        let t = Table::with_headers(["x"]);
        assert_eq!(resolve_field_column(&t, "Surface_habitable_logement"), None);
    }

    #[test]
    fn missing_column_is_created_with_diagnostic() {
        let t = Table::from_raw_rows(vec!["id".into()], &[vec!["1".into()], vec!["2".into()]]);
        let mut diags = Diagnostics::new();
        let (out, stats) = normalize_table(t, &field(), Side::Right, &mut diags);
        let col = out.column("Surface_habitable_logement").unwrap();
        assert_eq!(col.values, vec![Value::Missing, Value::Missing]);
        assert!(!stats.found);
        assert_eq!(diags.len(), 1);
        assert!(matches!(
            diags.iter().next().unwrap(),
            Diagnostic::MissingColumn { side: Side::Right, stage: Stage::Normalize, .. }
        ));
    }

    #[test]
    fn normalize_table_counts_outcomes() {
        let rows: Vec<Vec<String>> = ["45,5", "48.3 2.35", "O", "abc123m2", "3", "1500", ""]
            .iter()
            .map(|s| vec![s.to_string()])
            .collect();
        let t = Table::from_raw_rows(vec!["Surface_habitable_logement".into()], &rows);
        let mut diags = Diagnostics::new();
        let (out, stats) = normalize_table(t, &field(), Side::Left, &mut diags);

        let col = out.column("Surface_habitable_logement").unwrap();
        assert_eq!(col.kind, ColumnType::Number);
        assert_eq!(col.values[0], Value::Number(45.5));
        assert_eq!(col.values[3], Value::Number(123.0));
        assert_eq!(col.non_missing(), 2);

        assert_eq!(stats.total, 7);
        assert_eq!(stats.parsed, 1);
        assert_eq!(stats.digit_fallback, 1);
        assert_eq!(stats.coordinates, 1);
        assert_eq!(stats.no_digits, 1);
        assert_eq!(stats.out_of_range, 2);
        assert_eq!(stats.input_missing, 1);
        assert_eq!(stats.valid, 2);
        assert!(diags.is_empty());
    }
}
