//! In-memory ordering and pagination
//!
//! Used on the encrypted path, where the database cannot see through
//! ciphertext and the merged result set is sorted and sliced here instead.
//! Null values order after non-null values under [`SortOrder::Asc`]; a
//! descending sort is the exact reversal of the ascending one, so nulls
//! lead it.

use std::cmp::Ordering;

use crate::domain::view::{FieldValue, SortOrder, ViewColumn};
use crate::error::{Error, Result};

/// Sort `records` by `column` in `order`
///
/// Fails with [`Error::InvalidSortField`] when any non-null value the
/// column's getter yields does not carry the column's declared kind.
pub fn sort_records<R>(
    records: &mut [R],
    column: &ViewColumn<R>,
    order: SortOrder,
) -> Result<()> {
    for record in records.iter() {
        let value = (column.get)(record);
        if let Some(kind) = value.kind() {
            if kind != column.kind {
                return Err(Error::InvalidSortField(format!(
                    "{} yields {} values but is declared {}",
                    column.name, kind, column.kind
                )));
            }
        }
    }

    records.sort_by(|a, b| {
        let ord = compare_values(&(column.get)(a), &(column.get)(b));
        match order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
    Ok(())
}

fn compare_values(a: &FieldValue, b: &FieldValue) -> Ordering {
    match (a, b) {
        (FieldValue::Null, FieldValue::Null) => Ordering::Equal,
        (FieldValue::Null, _) => Ordering::Greater,
        (_, FieldValue::Null) => Ordering::Less,
        (FieldValue::Text(a), FieldValue::Text(b)) => a.cmp(b),
        (FieldValue::BigInt(a), FieldValue::BigInt(b)) => a.cmp(b),
        (FieldValue::Int(a), FieldValue::Int(b)) => a.cmp(b),
        (FieldValue::Bool(a), FieldValue::Bool(b)) => a.cmp(b),
        // Kind validation runs before sorting, so mixed pairs cannot reach
        // the comparator.
        _ => Ordering::Equal,
    }
}

/// Slice one page out of the sorted result set
///
/// An offset at or past the end yields an empty page, and a short tail
/// yields a short page.
pub fn page_slice<R>(records: Vec<R>, offset: usize, size: usize) -> Vec<R> {
    records.into_iter().skip(offset).take(size).collect()
}
