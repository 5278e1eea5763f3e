//! SQLite-backed query executor
//!
//! Binds planned statements against a connection pool and decodes each row
//! into a [`RawRow`] using the column specs the engine derived from the
//! view. Every column decodes as nullable; absent values become
//! [`FieldValue::Null`].

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::domain::view::ValueKind;
use crate::error::Result;
use crate::infrastructure::executor::{ColumnSpec, QueryExecutor, RawRow, SqlParam};
use crate::storage::Database;

/// [`QueryExecutor`] over a SQLite connection pool
#[derive(Debug, Clone)]
pub struct SqliteExecutor {
    pool: SqlitePool,
}

impl SqliteExecutor {
    /// Create an executor over an existing pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create an executor over a managed database handle
    pub fn from_database(database: &Database) -> Self {
        Self::new(database.pool().clone())
    }

    /// Get a reference to the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl QueryExecutor for SqliteExecutor {
    async fn fetch_rows(
        &self,
        sql: &str,
        params: &[SqlParam],
        columns: &[ColumnSpec],
    ) -> Result<Vec<RawRow>> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = match param {
                SqlParam::Text(value) => query.bind(value.clone()),
                SqlParam::BigInt(value) => query.bind(*value),
                SqlParam::Bool(value) => query.bind(*value),
            };
        }

        let rows = query.fetch_all(&self.pool).await?;
        let mut decoded = Vec::with_capacity(rows.len());
        for row in &rows {
            decoded.push(decode_row(row, columns)?);
        }
        Ok(decoded)
    }

    async fn fetch_count(&self, sql: &str, params: &[SqlParam]) -> Result<i64> {
        let mut query = sqlx::query_scalar::<_, i64>(sql);
        for param in params {
            query = match param {
                SqlParam::Text(value) => query.bind(value.clone()),
                SqlParam::BigInt(value) => query.bind(*value),
                SqlParam::Bool(value) => query.bind(*value),
            };
        }

        let count = query.fetch_one(&self.pool).await?;
        Ok(count)
    }
}

fn decode_row(row: &SqliteRow, columns: &[ColumnSpec]) -> Result<RawRow> {
    let mut raw = RawRow::new();
    for spec in columns {
        let name = spec.name.as_str();
        let value = match spec.kind {
            ValueKind::Text => row.try_get::<Option<String>, _>(name)?.into(),
            ValueKind::BigInt => row.try_get::<Option<i64>, _>(name)?.into(),
            ValueKind::Int => row.try_get::<Option<i32>, _>(name)?.into(),
            ValueKind::Bool => row.try_get::<Option<bool>, _>(name)?.into(),
        };
        raw.insert(name, value);
    }
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::view::FieldValue;
    use crate::error::Error;

    async fn seeded_executor() -> SqliteExecutor {
        let db = Database::in_memory()
            .await
            .expect("Failed to create test database");
        sqlx::query(
            r#"
            CREATE TABLE people (
                uuid TEXT PRIMARY KEY,
                name TEXT,
                age INTEGER,
                vip BOOLEAN
            )
            "#,
        )
        .execute(db.pool())
        .await
        .expect("create table");
        for (uuid, name, age, vip) in [
            ("u1", Some("alice"), Some(36_i64), Some(true)),
            ("u2", Some("bob"), None, Some(false)),
            ("u3", None, Some(19), None),
        ] {
            sqlx::query("INSERT INTO people (uuid, name, age, vip) VALUES (?, ?, ?, ?)")
                .bind(uuid)
                .bind(name)
                .bind(age)
                .bind(vip)
                .execute(db.pool())
                .await
                .expect("insert row");
        }
        SqliteExecutor::from_database(&db)
    }

    fn specs() -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::new("uuid", ValueKind::Text),
            ColumnSpec::new("name", ValueKind::Text),
            ColumnSpec::new("age", ValueKind::BigInt),
            ColumnSpec::new("vip", ValueKind::Bool),
        ]
    }

    #[tokio::test]
    async fn test_fetch_rows_decodes_typed_values() {
        let executor = seeded_executor().await;
        let rows = executor
            .fetch_rows("SELECT * FROM people ORDER BY uuid ASC", &[], &specs())
            .await
            .expect("fetch");

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].get("name"), FieldValue::Text("alice".to_string()));
        assert_eq!(rows[0].get("age"), FieldValue::BigInt(36));
        assert_eq!(rows[0].get("vip"), FieldValue::Bool(true));
        assert_eq!(rows[1].get("age"), FieldValue::Null);
        assert_eq!(rows[2].get("name"), FieldValue::Null);
        assert_eq!(rows[2].get("vip"), FieldValue::Null);
    }

    #[tokio::test]
    async fn test_fetch_rows_binds_parameters_in_order() {
        let executor = seeded_executor().await;
        let params = vec![
            SqlParam::BigInt(20),
            SqlParam::Bool(true),
        ];
        let rows = executor
            .fetch_rows(
                "SELECT * FROM people WHERE age > ? AND vip = ?",
                &params,
                &specs(),
            )
            .await
            .expect("fetch");

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("uuid"), FieldValue::Text("u1".to_string()));
    }

    #[tokio::test]
    async fn test_fetch_count_returns_scalar() {
        let executor = seeded_executor().await;
        let count = executor
            .fetch_count("SELECT count(*) FROM people WHERE name IS NOT NULL", &[])
            .await
            .expect("count");
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_missing_table_is_a_database_error() {
        let executor = seeded_executor().await;
        let err = executor
            .fetch_rows("SELECT * FROM nowhere", &[], &specs())
            .await
            .expect_err("must fail");
        assert!(matches!(err, Error::Database(_)));
    }

    #[tokio::test]
    async fn test_undeclared_column_decodes_as_missing() {
        // Only ask for a subset of columns; the rest read back null.
        let executor = seeded_executor().await;
        let rows = executor
            .fetch_rows(
                "SELECT * FROM people WHERE uuid = 'u1'",
                &[],
                &[ColumnSpec::new("uuid", ValueKind::Text)],
            )
            .await
            .expect("fetch");
        assert_eq!(rows[0].get("uuid"), FieldValue::Text("u1".to_string()));
        assert_eq!(rows[0].get("name"), FieldValue::Null);
    }
}
