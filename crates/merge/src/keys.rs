use std::collections::BTreeSet;

/// Choose the columns to join two tables on.
///
/// Priority keys present on both sides win, in priority order. Without any,
/// every shared column is used (sorted by name). No shared column at all
/// yields an empty list: the tables cannot be joined.
pub fn resolve_join_keys<L, R>(left: &[L], right: &[R], priority: &[String]) -> Vec<String>
where
    L: AsRef<str>,
    R: AsRef<str>,
{
    let left: BTreeSet<&str> = left.iter().map(|c| c.as_ref()).collect();
    let right: BTreeSet<&str> = right.iter().map(|c| c.as_ref()).collect();
    let common: BTreeSet<&str> = left.intersection(&right).copied().collect();

    let preferred: Vec<String> = priority
        .iter()
        .filter(|k| common.contains(k.as_str()))
        .cloned()
        .collect();

    if !preferred.is_empty() {
        return preferred;
    }

    common.into_iter().map(str::to_string).collect()
}
