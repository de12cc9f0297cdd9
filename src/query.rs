//! Relational-style operations over tables of [`Record`]s.
//!
//! Every operation takes a slice of rows and returns a newly allocated
//! vector; the input table is never modified. Operations are generic over
//! the row type, so they work equally on owned records and on references
//! (`&[&T]`), which is how derived views are chained without copying rows.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;

use crate::error::CalWaterError;
use crate::records::{FieldValue, Record};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl FromStr for SortOrder {
    type Err = CalWaterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Ascending),
            "desc" | "descending" => Ok(SortOrder::Descending),
            _ => Err(CalWaterError::validation(
                "order",
                format!("expected 'asc' or 'desc', got '{}'", s),
            )),
        }
    }
}

/// Comparison applied by [`filter_range`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    LessOrEqual,
    Less,
    GreaterOrEqual,
    Greater,
}

impl Comparison {
    fn holds(&self, value: f64, bound: f64) -> bool {
        match self {
            Comparison::LessOrEqual => value <= bound,
            Comparison::Less => value < bound,
            Comparison::GreaterOrEqual => value >= bound,
            Comparison::Greater => value > bound,
        }
    }
}

/// Key used by [`lookup_by_key`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyValue<'a> {
    /// Matched case-insensitively
    Text(&'a str),
    /// Matched exactly
    Integer(i64),
}

/// Borrow every row of a table, producing a view the other operations can chain on
pub fn view<T>(rows: &[T]) -> Vec<&T> {
    rows.iter().collect()
}

/// Inner join of two tables on a key column of each.
///
/// Produces one merged record per pair of rows whose keys match
/// case-insensitively. Rows without a partner, or with a missing key, are
/// dropped. Output follows the left table's order, then the right table's
/// order for multiple matches.
pub fn inner_join<'l, 'r, L, R, O, F>(
    left: &'l [L],
    right: &'r [R],
    left_key: &str,
    right_key: &str,
    merge: F,
) -> Vec<O>
where
    L: Record,
    R: Record,
    F: Fn(&'l L, &'r R) -> O,
{
    let mut index: HashMap<String, Vec<&'r R>> = HashMap::new();
    for row in right {
        if let Some(k) = row.field(right_key).and_then(|v| v.join_key()) {
            index.entry(k).or_default().push(row);
        }
    }

    let mut joined = Vec::new();
    for row in left {
        let Some(k) = row.field(left_key).and_then(|v| v.join_key()) else {
            continue;
        };
        if let Some(matches) = index.get(&k) {
            joined.extend(matches.iter().map(|&other| merge(row, other)));
        }
    }
    joined
}

/// Rows whose `field` equals `value`, ignoring case
pub fn filter_equals<R: Record + Clone>(rows: &[R], field: &str, value: &str) -> Vec<R> {
    rows.iter()
        .filter(|row| row.field(field).is_some_and(|v| v.matches_text(value)))
        .cloned()
        .collect()
}

/// Rows whose numeric `field` satisfies `op` against `bound`.
///
/// Rows with a missing or null value are excluded.
pub fn filter_range<R: Record + Clone>(
    rows: &[R],
    field: &str,
    op: Comparison,
    bound: f64,
) -> Vec<R> {
    rows.iter()
        .filter(|row| {
            row.field(field)
                .and_then(|v| v.as_f64())
                .is_some_and(|value| op.holds(value, bound))
        })
        .cloned()
        .collect()
}

/// Rows matching an arbitrary predicate
pub fn filter_by<R: Clone, P: Fn(&R) -> bool>(rows: &[R], predicate: P) -> Vec<R> {
    rows.iter().filter(|row| predicate(row)).cloned().collect()
}

/// Order two non-null field values: numbers numerically, text lexically,
/// numbers before text
pub fn compare_values(a: &FieldValue<'_>, b: &FieldValue<'_>) -> Ordering {
    match (a, b) {
        (FieldValue::Integer(x), FieldValue::Integer(y)) => x.cmp(y),
        (FieldValue::Text(x), FieldValue::Text(y)) => x.cmp(y),
        (FieldValue::Text(_), _) => Ordering::Greater,
        (_, FieldValue::Text(_)) => Ordering::Less,
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    }
}

/// Compare two rows on a field; nulls sort last whatever the direction
fn compare_rows<R: Record>(a: &R, b: &R, field: &str, order: SortOrder) -> Ordering {
    let a = a.field(field).filter(|v| !v.is_null());
    let b = b.field(field).filter(|v| !v.is_null());
    match (a, b) {
        (Some(x), Some(y)) => match order {
            SortOrder::Ascending => compare_values(&x, &y),
            SortOrder::Descending => compare_values(&y, &x),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable sort on `field`.
///
/// If the table has no such field the rows are returned in their original
/// order.
pub fn sort<R: Record + Clone>(rows: &[R], field: &str, order: SortOrder) -> Vec<R> {
    let mut sorted = rows.to_vec();
    let known = rows.first().is_some_and(|row| row.field(field).is_some());
    if known {
        sorted.sort_by(|a, b| compare_rows(a, b, field, order));
    }
    sorted
}

/// First row whose `key` field matches `value`
pub fn lookup_by_key<'a, R: Record>(rows: &'a [R], key: &str, value: KeyValue<'_>) -> Option<&'a R> {
    rows.iter().find(|row| match (row.field(key), value) {
        (Some(field), KeyValue::Text(text)) => field.matches_text(text),
        (Some(FieldValue::Integer(v)), KeyValue::Integer(expected)) => v == expected,
        _ => false,
    })
}

/// Keep only the named fields of a record, in the given order
pub fn project<R: Record>(row: &R, fields: &[&str]) -> serde_json::Map<String, serde_json::Value> {
    fields
        .iter()
        .filter_map(|name| {
            row.field(name)
                .map(|v| (name.to_string(), serde_json::Value::from(v)))
        })
        .collect()
}
