use immofuse_config::{FieldConfig, JoinConfig};
use immofuse_core::{Diagnostic, Diagnostics, Side, Table};

use crate::consolidate::consolidate_field;
use crate::join::merge_tables;
use crate::keys::resolve_join_keys;
use crate::model::{MergeOutcome, MergeSummary};
use crate::normalize::normalize_table;
use crate::stats::compute_field_stats;

/// Run normalize → key resolution → merge → consolidate over two loaded tables.
///
/// Never fails: absent columns and unparsable values degrade to missing
/// cells and are reported through the summary's diagnostics.
pub fn run(field: &FieldConfig, join: &JoinConfig, left: Table, right: Table) -> MergeOutcome {
    let mut diagnostics = Diagnostics::new();
    let left_rows = left.row_count();
    let right_rows = right.row_count();

    let (left, left_normalize) = normalize_table(left, field, Side::Left, &mut diagnostics);
    let (right, right_normalize) = normalize_table(right, field, Side::Right, &mut diagnostics);

    let join_keys = resolve_join_keys(&left.column_names(), &right.column_names(), &join.priority_keys);
    if join_keys.is_empty() {
        diagnostics.push(Diagnostic::NoJoinKeys);
    } else {
        log::info!("join keys: {}", join_keys.join(", "));
    }

    let joined = merge_tables(&left, &right, &join_keys, join);

    let (table, consolidation) = consolidate_field(joined.table, field, join, &mut diagnostics);
    let field_stats = compute_field_stats(&table, &field.name);

    let summary = MergeSummary {
        left_rows,
        right_rows,
        merged_rows: table.row_count(),
        join_keys,
        provenance: joined.provenance,
        left_normalize,
        right_normalize,
        consolidation,
        field: field_stats,
        diagnostics,
    };

    MergeOutcome { table, summary }
}
