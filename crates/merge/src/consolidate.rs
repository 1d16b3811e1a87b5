use immofuse_config::{FieldConfig, JoinConfig};
use immofuse_core::{Column, Diagnostic, Diagnostics, Side, Stage, Table, Value};

use crate::model::Consolidation;

fn starts_with_ignore_case(name: &str, prefix: &str) -> bool {
    name.len() >= prefix.len()
        && name.is_char_boundary(prefix.len())
        && name[..prefix.len()].eq_ignore_ascii_case(prefix)
}

/// Collapse the field's prefixed copies into one column named after the field.
///
/// Right values take precedence; a missing right value falls back to the
/// left one. The prefixed copies stay in the table. Without any prefixed
/// copy the field column is all-missing and a diagnostic is recorded.
pub fn consolidate_field(
    table: Table,
    field: &FieldConfig,
    join: &JoinConfig,
    diagnostics: &mut Diagnostics,
) -> (Table, Consolidation) {
    let needle = field.name.to_lowercase();
    let candidates: Vec<&Column> = table
        .columns()
        .iter()
        .filter(|c| c.name.to_lowercase().contains(&needle))
        .collect();

    let right = candidates
        .iter()
        .find(|c| starts_with_ignore_case(&c.name, &join.right_prefix))
        .copied();
    let left = candidates
        .iter()
        .find(|c| starts_with_ignore_case(&c.name, &join.left_prefix))
        .copied();

    log::debug!(
        "consolidating '{}' from {:?}",
        field.name,
        candidates.iter().map(|c| c.name.as_str()).collect::<Vec<_>>()
    );

    let (values, consolidation) = match (right, left) {
        (Some(r), Some(l)) => {
            let values = r
                .values
                .iter()
                .zip(&l.values)
                .map(|(rv, lv)| if rv.is_missing() { lv.clone() } else { rv.clone() })
                .collect::<Vec<Value>>();
            let how = Consolidation::Coalesced { right: r.name.clone(), left: l.name.clone() };
            (values, how)
        }
        (Some(only), None) | (None, Some(only)) => {
            (only.values.clone(), Consolidation::Single { column: only.name.clone() })
        }
        (None, None) => {
            diagnostics.push(Diagnostic::MissingColumn {
                stage: Stage::Consolidate,
                side: Side::Merged,
                column: field.name.clone(),
            });
            (vec![Value::Missing; table.row_count()], Consolidation::Absent)
        }
    };

    let column = Column::new(field.name.clone(), values);
    (table.with_column(column), consolidation)
}
