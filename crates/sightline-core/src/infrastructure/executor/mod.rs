//! Query execution seam
//!
//! The engine plans SQL but never touches a connection itself; it hands the
//! statement, its positional parameters, and the expected column shapes to a
//! [`QueryExecutor`]. Rows come back as loosely typed [`RawRow`] maps so the
//! population stage can decrypt and convert them without the executor
//! knowing anything about view records.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::view::{FieldValue, ValueKind};
use crate::error::Result;

pub mod sqlite;

pub use sqlite::SqliteExecutor;

/// One positional SQL parameter
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    BigInt(i64),
    Bool(bool),
}

/// Name and kind of one column the executor should decode
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ValueKind,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// One fetched row, keyed by column name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    values: HashMap<String, FieldValue>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store one column value
    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.values.insert(name.into(), value);
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.insert(name, value);
        self
    }

    /// Read one column value; columns the executor never decoded read as null
    pub fn get(&self, name: &str) -> FieldValue {
        self.values.get(name).cloned().unwrap_or(FieldValue::Null)
    }
}

/// Executes planned search statements against a database
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Run a select and decode each row per `columns`
    async fn fetch_rows(
        &self,
        sql: &str,
        params: &[SqlParam],
        columns: &[ColumnSpec],
    ) -> Result<Vec<RawRow>>;

    /// Run a count statement and return its single scalar
    async fn fetch_count(&self, sql: &str, params: &[SqlParam]) -> Result<i64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time check that the trait stays object safe, since the engine
    // holds it as Arc<dyn QueryExecutor>.
    fn _assert_object_safe(_executor: &dyn QueryExecutor) {}

    #[test]
    fn test_raw_row_reads_back_inserted_values() {
        let mut row = RawRow::new();
        row.insert("name", FieldValue::Text("ada".to_string()));
        row.insert("age", FieldValue::BigInt(36));
        assert_eq!(row.get("name"), FieldValue::Text("ada".to_string()));
        assert_eq!(row.get("age"), FieldValue::BigInt(36));
    }

    #[test]
    fn test_missing_column_reads_as_null() {
        let row = RawRow::new();
        assert_eq!(row.get("anything"), FieldValue::Null);
    }

    #[test]
    fn test_builder_form_chains() {
        let row = RawRow::new()
            .with("a", FieldValue::Bool(true))
            .with("b", FieldValue::Null);
        assert_eq!(row.get("a"), FieldValue::Bool(true));
        assert_eq!(row.get("b"), FieldValue::Null);
    }
}
