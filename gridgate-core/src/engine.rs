//! Search, filter, and multi-key sort over record sets.
//!
//! Every function here is pure: the same records, columns, and view state
//! always produce the same result, nothing is cached, and malformed or
//! missing values degrade to "no match" rather than errors.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::column::{Column, find_column};
use crate::value::Value;
use crate::view::{DerivedView, SortDirection, SortKey, ViewState};

/// Whether any declared column of `record` contains `query`, ignoring case.
///
/// An empty query matches every record. Null values never match.
pub fn matches_search<R>(record: &R, columns: &[Column<R>], query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let needle = query.to_lowercase();

    columns.iter().any(|column| {
        column
            .value(record)
            .search_text()
            .map(|text| text.to_lowercase().contains(&needle))
            .unwrap_or(false)
    })
}

/// Whether `record` satisfies every active filter.
///
/// - list filters: the record's value must be one of the listed values
/// - text filters: case-insensitive substring of the record's value
/// - anything else: strict equality
///
/// Inactive filters (null, empty text, empty list) are skipped. A filter on
/// an undeclared column matches nothing.
pub fn matches_filters<R>(
    record: &R,
    columns: &[Column<R>],
    filters: &BTreeMap<String, Value>,
) -> bool {
    filters
        .iter()
        .filter(|(_, wanted)| wanted.is_active_filter())
        .all(|(key, wanted)| {
            let Some(column) = find_column(columns, key) else {
                return false;
            };
            filter_matches(&column.value(record), wanted)
        })
}

fn filter_matches(actual: &Value, wanted: &Value) -> bool {
    match wanted {
        Value::List(allowed) => allowed.contains(actual),
        Value::Text(needle) => actual
            .search_text()
            .map(|text| text.to_lowercase().contains(&needle.to_lowercase()))
            .unwrap_or(false),
        other => actual == other,
    }
}

/// Compare two values for one sort key.
///
/// Nulls go last in both directions; `Desc` only reverses the comparison of
/// non-null values.
fn compare_values(a: &Value, b: &Value, direction: SortDirection) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ord = a.native_cmp(b);
            match direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        }
    }
}

/// Lexicographic comparison of two records over a sort list.
///
/// Sort keys naming undeclared columns compare every record as equal.
pub fn compare_records<R>(a: &R, b: &R, columns: &[Column<R>], sort: &[SortKey]) -> Ordering {
    for sort_key in sort {
        let Some(column) = find_column(columns, &sort_key.key) else {
            continue;
        };
        match compare_values(&column.value(a), &column.value(b), sort_key.direction) {
            Ordering::Equal => continue,
            non_eq => return non_eq,
        }
    }
    Ordering::Equal
}

/// Apply search and filters, keeping source order.
pub fn filter_records<'a, R>(
    records: &'a [R],
    columns: &[Column<R>],
    view: &ViewState,
) -> Vec<&'a R> {
    records
        .iter()
        .filter(|record| matches_search(*record, columns, &view.search_query))
        .filter(|record| matches_filters(*record, columns, &view.filters))
        .collect()
}

/// Stable sort of already-filtered records.
///
/// Records tied on every active key keep their relative order.
pub fn sort_records<'a, R>(
    filtered: &[&'a R],
    columns: &[Column<R>],
    sort: &[SortKey],
) -> Vec<&'a R> {
    let mut sorted = filtered.to_vec();
    if sort.is_empty() {
        return sorted;
    }

    // Read each key's value once per record rather than once per comparison
    let keyed_columns: Vec<(&Column<R>, SortDirection)> = sort
        .iter()
        .filter_map(|s| find_column(columns, &s.key).map(|c| (c, s.direction)))
        .collect();
    if keyed_columns.is_empty() {
        return sorted;
    }

    let mut decorated: Vec<(Vec<Value>, &'a R)> = sorted
        .drain(..)
        .map(|record| {
            let values = keyed_columns.iter().map(|(c, _)| c.value(record)).collect();
            (values, record)
        })
        .collect();

    decorated.sort_by(|(a, _), (b, _)| {
        for (i, (_, direction)) in keyed_columns.iter().enumerate() {
            match compare_values(&a[i], &b[i], *direction) {
                Ordering::Equal => continue,
                non_eq => return non_eq,
            }
        }
        Ordering::Equal
    });

    decorated.into_iter().map(|(_, record)| record).collect()
}

/// Compute the derived view for `records` under `view`.
pub fn derive<'a, R>(
    records: &'a [R],
    columns: &[Column<R>],
    view: &ViewState,
) -> DerivedView<'a, R> {
    let filtered = filter_records(records, columns, view);
    let sorted = sort_records(&filtered, columns, &view.sort);
    let total = filtered.len();

    tracing::trace!(
        source = records.len(),
        total,
        sort_keys = view.sort.len(),
        "derived view"
    );

    DerivedView {
        filtered,
        sorted,
        total,
    }
}

/// Advance the sort cycle for `key`.
///
/// Not sorted → ascending (appended) → descending (same position) → removed.
/// Other keys keep their relative order.
pub fn toggle_sort(sort: &mut Vec<SortKey>, key: &str) {
    match sort.iter().position(|s| s.key == key) {
        None => sort.push(SortKey::asc(key)),
        Some(index) => match sort[index].direction {
            SortDirection::Asc => sort[index].direction = SortDirection::Desc,
            SortDirection::Desc => {
                sort.remove(index);
            }
        },
    }
}
