//! sqlx-backed store. Postgres in production, SQLite through the same `Any`
//! driver in tests.

use crate::core::error::StoreError;
use crate::core::record::{ExchangeRate, STORE_DATE_FORMAT, User};
use crate::core::store::Store;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Row};
use tracing::debug;
use uuid::Uuid;

const CREATE_RATES: &str = r#"
CREATE TABLE IF NOT EXISTS rates (
    id BIGINT NOT NULL,
    code TEXT NOT NULL,
    ccy TEXT NOT NULL,
    ccy_name_ru TEXT NOT NULL,
    ccy_name_uz TEXT NOT NULL,
    ccy_name_uzc TEXT NOT NULL,
    ccy_name_en TEXT NOT NULL,
    nominal TEXT NOT NULL,
    rate DOUBLE PRECISION NOT NULL,
    diff TEXT NOT NULL,
    rate_date TEXT NOT NULL
)"#;

// Natural key, not unique: reloading a feed appends rows.
const CREATE_RATES_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS rates_ccy_date_idx ON rates (ccy, rate_date)";

const CREATE_USERS: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    email TEXT NOT NULL,
    currency TEXT NOT NULL,
    balance DOUBLE PRECISION NOT NULL,
    converted_balance DOUBLE PRECISION
)"#;

const CONVERT_BALANCES: &str = r#"
UPDATE users
SET converted_balance = balance * (
    CASE
        WHEN currency = $1 THEN 1.0
        ELSE (
            SELECT r.rate
            FROM rates r
            WHERE r.ccy = users.currency
            ORDER BY r.rate_date DESC, r.id DESC
            LIMIT 1
        )
    END
)
WHERE currency = $1
   OR EXISTS (SELECT 1 FROM rates r WHERE r.ccy = users.currency)"#;

/// `Store` backed by a `sqlx` connection pool. The driver is picked from the
/// URL scheme, so the same statements run against PostgreSQL and SQLite.
pub struct SqlStore {
    pool: AnyPool,
}

impl SqlStore {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        sqlx::any::install_default_drivers();

        let scheme = url.split(':').next().unwrap_or_default();
        debug!(scheme, max_connections, "Connecting to database");

        let pool = AnyPoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(url)
            .await?;
        Ok(Self { pool })
    }
}

fn parse_rate_row(row: &AnyRow) -> Result<ExchangeRate, StoreError> {
    let date: String = row.try_get("rate_date")?;
    let date = NaiveDate::parse_from_str(&date, STORE_DATE_FORMAT).map_err(|_| {
        StoreError::Malformed {
            column: "rate_date",
            value: date.clone(),
        }
    })?;

    Ok(ExchangeRate {
        id: row.try_get("id")?,
        code: row.try_get("code")?,
        currency: row.try_get("ccy")?,
        name_ru: row.try_get("ccy_name_ru")?,
        name_uz: row.try_get("ccy_name_uz")?,
        name_uzc: row.try_get("ccy_name_uzc")?,
        name_en: row.try_get("ccy_name_en")?,
        nominal: row.try_get("nominal")?,
        rate: row.try_get("rate")?,
        diff: row.try_get("diff")?,
        date,
    })
}

fn parse_user_row(row: &AnyRow) -> Result<User, StoreError> {
    let id: String = row.try_get("id")?;
    let id = Uuid::parse_str(&id).map_err(|_| StoreError::Malformed {
        column: "id",
        value: id.clone(),
    })?;

    Ok(User {
        id,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        email: row.try_get("email")?,
        currency: row.try_get("currency")?,
        balance: row.try_get("balance")?,
        converted_balance: row.try_get("converted_balance")?,
    })
}

#[async_trait]
impl Store for SqlStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in [CREATE_RATES, CREATE_RATES_INDEX, CREATE_USERS] {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        debug!("Schema is ready");
        Ok(())
    }

    async fn insert_rate(&self, rate: &ExchangeRate) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO rates (
                id, code, ccy, ccy_name_ru, ccy_name_uz, ccy_name_uzc, ccy_name_en,
                nominal, rate, diff, rate_date
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"#,
        )
        .bind(rate.id)
        .bind(&rate.code)
        .bind(&rate.currency)
        .bind(&rate.name_ru)
        .bind(&rate.name_uz)
        .bind(&rate.name_uzc)
        .bind(&rate.name_en)
        .bind(&rate.nominal)
        .bind(rate.rate)
        .bind(&rate.diff)
        .bind(rate.date.format(STORE_DATE_FORMAT).to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, first_name, last_name, email, currency, balance
            ) VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(user.id.to_string())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.currency)
        .bind(user.balance)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn rates(&self) -> Result<Vec<ExchangeRate>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, code, ccy, ccy_name_ru, ccy_name_uz, ccy_name_uzc, ccy_name_en,
                   nominal, rate, diff, rate_date
            FROM rates
            ORDER BY rate_date, id"#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(parse_rate_row).collect()
    }

    async fn users(&self) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, first_name, last_name, email, currency, balance, converted_balance
            FROM users
            ORDER BY last_name, first_name, id"#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(parse_user_row).collect()
    }

    async fn apply_rate(&self, currency: &str, rate: f64) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET converted_balance = balance * $1
            WHERE currency = $2"#,
        )
        .bind(rate)
        .bind(currency)
        .execute(&self.pool)
        .await?;

        debug!(currency, rate, rows = result.rows_affected(), "Applied rate");
        Ok(result.rows_affected())
    }

    async fn convert_balances(&self, base_currency: &str) -> Result<u64, StoreError> {
        let result = sqlx::query(CONVERT_BALANCES)
            .bind(base_currency)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
