//! Demo dataset: a customers/accounts schema behind a denormalized search
//! view. The ssn column stores ciphertext and participates in filtering, so
//! searches against this view always take the in-memory fallback path.

use anyhow::Context;
use serde::Serialize;
use sightline_core::domain::view::{
    FieldValue, SortOrder, SortSpec, ValueKind, ViewColumn, ViewRecord, ViewSource,
};
use sightline_core::infrastructure::crypto::{AesFieldCipher, FieldCipher};
use sightline_core::infrastructure::executor::SqlParam;
use sightline_core::Error;
use sqlx::SqlitePool;
use uuid::Uuid;

const FIRST_NAMES: &[&str] = &[
    "Ana", "Bruno", "Carla", "Diego", "Elena", "Filipe", "Gloria", "Hugo", "Ines", "Joao",
    "Katia", "Luis", "Marta", "Nuno", "Olivia", "Pedro",
];

const LAST_NAMES: &[&str] = &[
    "Almeida", "Barros", "Costa", "Duarte", "Ferreira", "Gomes", "Henriques", "Lopes", "Martins",
    "Nogueira", "Oliveira", "Pereira",
];

const CITIES: &[&str] = &["Lisbon", "Porto", "Madrid", "Seville", "Valencia"];

#[derive(Debug, Clone, Default, Serialize)]
pub struct AccountInfo {
    pub plan: Option<String>,
    pub balance: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CustomerRecord {
    pub uuid: String,
    pub name: Option<String>,
    pub city: Option<String>,
    pub ssn: Option<String>,
    pub age: Option<i64>,
    pub vip: Option<bool>,
    pub account: AccountInfo,
}

impl ViewRecord for CustomerRecord {
    fn uuid(&self) -> &str {
        &self.uuid
    }
}

/// The demo's search view definition
pub struct CustomerSearchView {
    columns: Vec<ViewColumn<CustomerRecord>>,
}

impl CustomerSearchView {
    pub fn new() -> Self {
        Self {
            columns: vec![
                ViewColumn::new(
                    "uuid",
                    "uuid",
                    ValueKind::Text,
                    |r: &CustomerRecord| FieldValue::Text(r.uuid.clone()),
                    |r, v| r.uuid = v.into_text().unwrap_or_default(),
                ),
                ViewColumn::new(
                    "name",
                    "name",
                    ValueKind::Text,
                    |r: &CustomerRecord| r.name.clone().into(),
                    |r, v| r.name = v.into_text(),
                )
                .filterable(),
                ViewColumn::new(
                    "city",
                    "city",
                    ValueKind::Text,
                    |r: &CustomerRecord| r.city.clone().into(),
                    |r, v| r.city = v.into_text(),
                )
                .filterable(),
                ViewColumn::new(
                    "ssn",
                    "ssn",
                    ValueKind::Text,
                    |r: &CustomerRecord| r.ssn.clone().into(),
                    |r, v| r.ssn = v.into_text(),
                )
                .encrypted()
                .filterable(),
                ViewColumn::new(
                    "age",
                    "age",
                    ValueKind::BigInt,
                    |r: &CustomerRecord| r.age.into(),
                    |r, v| r.age = v.into_big_int(),
                ),
                ViewColumn::new(
                    "vip",
                    "vip",
                    ValueKind::Bool,
                    |r: &CustomerRecord| r.vip.into(),
                    |r, v| r.vip = v.into_bool(),
                ),
                ViewColumn::new(
                    "account_plan",
                    "account_plan",
                    ValueKind::Text,
                    |r: &CustomerRecord| r.account.plan.clone().into(),
                    |r, v| r.account.plan = v.into_text(),
                )
                .for_entity("account"),
                ViewColumn::new(
                    "account_balance",
                    "account_balance",
                    ValueKind::BigInt,
                    |r: &CustomerRecord| r.account.balance.into(),
                    |r, v| r.account.balance = v.into_big_int(),
                )
                .for_entity("account"),
            ],
        }
    }
}

impl Default for CustomerSearchView {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewSource for CustomerSearchView {
    type Record = CustomerRecord;

    fn view(&self) -> &str {
        "customer_search_view"
    }

    fn fixed_filter(&self) -> &str {
        "deleted = 0"
    }

    fn columns(&self) -> &[ViewColumn<CustomerRecord>] {
        &self.columns
    }

    fn filter_clause(&self, filter: &str, params: &mut Vec<SqlParam>) -> String {
        let pattern = format!("%{}%", filter.to_lowercase());
        params.push(SqlParam::Text(pattern.clone()));
        params.push(SqlParam::Text(pattern));
        "lower(name) LIKE ? OR lower(city) LIKE ?".to_string()
    }

    fn bound_clause(
        &self,
        name: &str,
        value: &str,
        params: &mut Vec<SqlParam>,
    ) -> sightline_core::Result<String> {
        match name {
            "city" => {
                params.push(SqlParam::Text(value.to_string()));
                Ok("lower(city) = lower(?)".to_string())
            }
            "min_age" => {
                let min = value.parse::<i64>().map_err(|_| {
                    Error::InvalidBoundValue(format!("min_age must be an integer, got '{value}'"))
                })?;
                params.push(SqlParam::BigInt(min));
                Ok("age >= ?".to_string())
            }
            "vip" => {
                let flag = value.parse::<bool>().map_err(|_| {
                    Error::InvalidBoundValue(format!("vip must be true or false, got '{value}'"))
                })?;
                params.push(SqlParam::Bool(flag));
                Ok("vip = ?".to_string())
            }
            _ => Err(Error::UnknownBound(name.to_string())),
        }
    }

    fn default_sort(&self) -> SortSpec {
        SortSpec::new("name", SortOrder::Asc)
    }
}

/// Drop and recreate the demo tables and view so reseeding starts clean
pub async fn create_schema(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query("DROP VIEW IF EXISTS customer_search_view")
        .execute(pool)
        .await
        .context("Failed to drop demo view")?;
    sqlx::query("DROP TABLE IF EXISTS accounts")
        .execute(pool)
        .await
        .context("Failed to drop accounts table")?;
    sqlx::query("DROP TABLE IF EXISTS customers")
        .execute(pool)
        .await
        .context("Failed to drop customers table")?;

    sqlx::query(
        r#"
        CREATE TABLE customers (
            uuid TEXT PRIMARY KEY,
            name TEXT,
            city TEXT,
            ssn TEXT,
            age INTEGER,
            vip BOOLEAN,
            deleted INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create customers table")?;

    sqlx::query(
        r#"
        CREATE TABLE accounts (
            customer_uuid TEXT NOT NULL REFERENCES customers(uuid),
            plan TEXT,
            balance INTEGER
        )
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create accounts table")?;

    sqlx::query(
        r#"
        CREATE VIEW customer_search_view AS
        SELECT c.uuid, c.name, c.city, c.ssn, c.age, c.vip, c.deleted,
               a.plan AS account_plan, a.balance AS account_balance
        FROM customers c
        LEFT JOIN accounts a ON a.customer_uuid = c.uuid
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create demo view")?;

    Ok(())
}

/// Seed `count` customers with encrypted ssn values. Every third customer
/// has no account row.
pub async fn seed(pool: &SqlitePool, cipher: &AesFieldCipher, count: usize) -> anyhow::Result<()> {
    for i in 0..count {
        let uuid = Uuid::new_v4().to_string();
        let name = format!(
            "{} {}",
            FIRST_NAMES[i % FIRST_NAMES.len()],
            LAST_NAMES[i % LAST_NAMES.len()],
        );
        let city = CITIES[i % CITIES.len()];
        let age = 21 + (i as i64 * 3) % 50;
        let vip = i % 4 == 0;
        let ssn = format!("{:03}-{:02}-{:04}", 100 + i * 7 % 900, i % 100, 1000 + i);
        let encrypted_ssn = cipher
            .encrypt(&ssn)
            .map_err(|e| anyhow::anyhow!("Failed to encrypt demo ssn: {e}"))?;

        sqlx::query(
            r#"
            INSERT INTO customers (uuid, name, city, ssn, age, vip, deleted)
            VALUES (?, ?, ?, ?, ?, ?, 0)
            "#,
        )
        .bind(&uuid)
        .bind(&name)
        .bind(city)
        .bind(&encrypted_ssn)
        .bind(age)
        .bind(vip)
        .execute(pool)
        .await
        .context("Failed to insert demo customer")?;

        if i % 3 != 0 {
            let plan = if i % 2 == 0 { "basic" } else { "premium" };
            let balance = 250 * (i as i64 + 1);
            sqlx::query(
                r#"
                INSERT INTO accounts (customer_uuid, plan, balance)
                VALUES (?, ?, ?)
                "#,
            )
            .bind(&uuid)
            .bind(plan)
            .bind(balance)
            .execute(pool)
            .await
            .context("Failed to insert demo account")?;
        }
    }
    Ok(())
}

/// Row count of the demo view, or `None` when it has not been seeded
pub async fn view_row_count(pool: &SqlitePool) -> anyhow::Result<Option<i64>> {
    let exists: Option<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'view' AND name = 'customer_search_view'",
    )
    .fetch_optional(pool)
    .await
    .context("Failed to inspect database schema")?;

    if exists.is_none() {
        return Ok(None);
    }

    let count: i64 = sqlx::query_scalar("SELECT count(*) FROM customer_search_view")
        .fetch_one(pool)
        .await
        .context("Failed to count demo view rows")?;
    Ok(Some(count))
}

/// One result row formatted for terminal output
pub fn render_line(record: &CustomerRecord) -> String {
    let name = record.name.as_deref().unwrap_or("(unnamed)");
    let city = record.city.as_deref().unwrap_or("-");
    let age = record
        .age
        .map(|a| a.to_string())
        .unwrap_or_else(|| "-".to_string());
    let plan = record.account.plan.as_deref().unwrap_or("no account");
    format!(
        "{:<38} {:<20} {:<10} {:>3}  {}",
        record.uuid, name, city, age, plan
    )
}
