use immofuse_core::Table;

use crate::model::FieldStats;

/// Compute descriptive statistics for a numeric column.
///
/// Non-numeric cells count as rows but not as values. An absent column
/// yields zero values.
pub fn compute_field_stats(table: &Table, column: &str) -> FieldStats {
    let values: Vec<f64> = table
        .column(column)
        .map(|c| c.values.iter().filter_map(|v| v.as_number()).collect())
        .unwrap_or_default();

    let mut stats = FieldStats {
        column: column.to_string(),
        rows: table.row_count(),
        non_missing: values.len(),
        ..FieldStats::default()
    };

    if values.is_empty() {
        return stats;
    }

    let count = values.len() as f64;
    let mean = values.iter().sum::<f64>() / count;
    stats.min = values.iter().copied().reduce(f64::min);
    stats.max = values.iter().copied().reduce(f64::max);
    stats.mean = Some(mean);

    if values.len() > 1 {
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1.0);
        stats.std_dev = Some(var.sqrt());
    }

    stats
}
