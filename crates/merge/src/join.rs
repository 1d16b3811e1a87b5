// Full outer join of the two sources, or plain concatenation when no key is shared.
// Pure functions: two tables in, one merged table out.

use std::borrow::Cow;
use std::collections::HashMap;

use immofuse_config::JoinConfig;
use immofuse_core::{Column, Table, Value};

use crate::model::{Provenance, ProvenanceCounts};

/// Merged table plus per-row provenance counts.
#[derive(Debug, Clone)]
pub struct Joined {
    pub table: Table,
    pub provenance: ProvenanceCounts,
}

/// One output row: indices into the left and right tables.
type RowPair = (Option<usize>, Option<usize>);

fn provenance_of(pair: RowPair) -> Provenance {
    match pair {
        (Some(_), Some(_)) => Provenance::Both,
        (Some(_), None) => Provenance::LeftOnly,
        _ => Provenance::RightOnly,
    }
}

/// Merge `left` and `right`.
///
/// With keys: non-key columns get the configured side prefix, key columns
/// keep their names, and every key match produces a row (fan-out on
/// duplicate keys). Unmatched rows of either side appear once with the other
/// side missing. Without keys the tables are stacked, left rows first.
pub fn merge_tables(left: &Table, right: &Table, keys: &[String], config: &JoinConfig) -> Joined {
    let pairs = if keys.is_empty() {
        stack_pairs(left, right)
    } else {
        match_pairs(left, right, keys)
    };

    let mut table = if keys.is_empty() {
        concat_columns(left, right, &pairs)
    } else {
        joined_columns(left, right, keys, config, &pairs)
    };

    let mut provenance = ProvenanceCounts::default();
    let tags: Vec<Value> = pairs
        .iter()
        .map(|&pair| {
            let p = provenance_of(pair);
            provenance.record(p);
            Value::Text(p.as_str().to_string())
        })
        .collect();
    table = table.with_column(Column::new(config.provenance_column.clone(), tags));

    log::debug!(
        "merged {} rows: {} both, {} left only, {} right only",
        provenance.total(),
        provenance.both,
        provenance.left_only,
        provenance.right_only
    );

    Joined { table, provenance }
}

// ---------------------------------------------------------------------------
// Row pairing
// ---------------------------------------------------------------------------

fn stack_pairs(left: &Table, right: &Table) -> Vec<RowPair> {
    (0..left.row_count())
        .map(|l| (Some(l), None))
        .chain((0..right.row_count()).map(|r| (None, Some(r))))
        .collect()
}

/// Composite key of one row; `None` entries are missing cells.
fn row_key<'a>(cols: &[Option<&'a Column>], row: usize) -> Vec<Option<Cow<'a, str>>> {
    cols.iter()
        .map(|c| c.and_then(|c| c.values[row].key_repr()))
        .collect()
}

fn match_pairs(left: &Table, right: &Table, keys: &[String]) -> Vec<RowPair> {
    let left_keys: Vec<Option<&Column>> = keys.iter().map(|k| left.column(k)).collect();
    let right_keys: Vec<Option<&Column>> = keys.iter().map(|k| right.column(k)).collect();

    let mut right_index: HashMap<Vec<Option<Cow<'_, str>>>, Vec<usize>> = HashMap::new();
    for r in 0..right.row_count() {
        right_index.entry(row_key(&right_keys, r)).or_default().push(r);
    }

    let mut right_matched = vec![false; right.row_count()];
    let mut pairs = Vec::with_capacity(left.row_count().max(right.row_count()));

    for l in 0..left.row_count() {
        match right_index.get(&row_key(&left_keys, l)) {
            Some(matches) => {
                for &r in matches {
                    right_matched[r] = true;
                    pairs.push((Some(l), Some(r)));
                }
            }
            None => pairs.push((Some(l), None)),
        }
    }

    for (r, matched) in right_matched.iter().enumerate() {
        if !matched {
            pairs.push((None, Some(r)));
        }
    }

    pairs
}

// ---------------------------------------------------------------------------
// Column assembly
// ---------------------------------------------------------------------------

fn pick(column: Option<&Column>, row: Option<usize>) -> Value {
    match (column, row) {
        (Some(c), Some(r)) => c.values[r].clone(),
        _ => Value::Missing,
    }
}

fn concat_columns(left: &Table, right: &Table, pairs: &[RowPair]) -> Table {
    let mut names: Vec<&str> = left.column_names();
    for name in right.column_names() {
        if !names.contains(&name) {
            names.push(name);
        }
    }

    let columns = names
        .into_iter()
        .map(|name| {
            let (lc, rc) = (left.column(name), right.column(name));
            let values = pairs
                .iter()
                .map(|&(l, r)| match l {
                    Some(_) => pick(lc, l),
                    None => pick(rc, r),
                })
                .collect();
            Column::new(name, values)
        })
        .collect();

    Table::from_columns(columns)
}

fn joined_columns(
    left: &Table,
    right: &Table,
    keys: &[String],
    config: &JoinConfig,
    pairs: &[RowPair],
) -> Table {
    let is_key = |name: &str| keys.iter().any(|k| k == name);
    let mut columns = Vec::with_capacity(left.column_count() + right.column_count());

    for lc in left.columns() {
        let values = if is_key(&lc.name) {
            let rc = right.column(&lc.name);
            pairs
                .iter()
                .map(|&(l, r)| match l {
                    Some(_) => pick(Some(lc), l),
                    None => pick(rc, r),
                })
                .collect()
        } else {
            pairs.iter().map(|&(l, _)| pick(Some(lc), l)).collect()
        };
        let name = if is_key(&lc.name) {
            lc.name.clone()
        } else {
            format!("{}{}", config.left_prefix, lc.name)
        };
        columns.push(Column::new(name, values));
    }

    for rc in right.columns().iter().filter(|c| !is_key(&c.name)) {
        let values = pairs.iter().map(|&(_, r)| pick(Some(rc), r)).collect();
        columns.push(Column::new(format!("{}{}", config.right_prefix, rc.name), values));
    }

    Table::from_columns(columns)
}
