//! SQLite-backed record store with upsert-by-natural-key.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use super::{StoreError, StoreResult};
use crate::chunk::TimeRange;
use crate::Record;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    series_key TEXT NOT NULL,
    timestamp  TEXT NOT NULL,
    value      TEXT NOT NULL,
    value_min  TEXT,
    value_max  TEXT,
    geo_id     INTEGER,
    geo_name   TEXT,
    extra      TEXT NOT NULL DEFAULT '{}',
    PRIMARY KEY (series_key, timestamp)
);
CREATE INDEX IF NOT EXISTS idx_records_series_ts ON records (series_key, timestamp);
"#;

/// Relational record store keyed by `(series_key, timestamp)`.
///
/// Writing a key that already exists overwrites the non-key columns in place;
/// replaying any batch is therefore safe. Batches are applied inside a single
/// transaction, so a failure rolls the whole batch back.
///
/// This design assumes a single writer process; the pool is capped at one
/// connection.
#[derive(Clone)]
pub struct RecordStore {
    pool: SqlitePool,
}

impl RecordStore {
    /// Open (and create if missing) the database at `url`, e.g.
    /// `sqlite://energy.db`, and ensure the schema exists.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(StoreError::Database)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.init_schema().await?;
        info!(url, "record store ready");
        Ok(store)
    }

    /// Open a private in-memory database (used by tests).
    pub async fn in_memory() -> StoreResult<Self> {
        Self::connect("sqlite::memory:").await
    }

    /// Close the connection pool. Subsequent operations fail with a
    /// database error.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn init_schema(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    /// Upsert `records` in one transaction and return the number of rows that
    /// were newly inserted (as opposed to updated in place).
    ///
    /// Replaying the same batch leaves the stored state unchanged and
    /// reports 0 insertions.
    pub async fn upsert_batch(&self, records: &[Record]) -> StoreResult<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;

        let before: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records")
            .fetch_one(&mut *tx)
            .await?;

        for record in records {
            let extra = serde_json::to_string(&record.extra)
                .map_err(|e| StoreError::Corrupt(e.to_string()))?;
            sqlx::query(
                r#"
                INSERT INTO records
                    (series_key, timestamp, value, value_min, value_max, geo_id, geo_name, extra)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT (series_key, timestamp) DO UPDATE SET
                    value = excluded.value,
                    value_min = excluded.value_min,
                    value_max = excluded.value_max,
                    geo_id = excluded.geo_id,
                    geo_name = excluded.geo_name,
                    extra = excluded.extra
                "#,
            )
            .bind(&record.series_key)
            .bind(format_timestamp(&record.timestamp))
            .bind(record.value.to_string())
            .bind(record.value_min.map(|d| d.to_string()))
            .bind(record.value_max.map(|d| d.to_string()))
            .bind(record.geo_id)
            .bind(&record.geo_name)
            .bind(extra)
            .execute(&mut *tx)
            .await?;
        }

        let after: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records")
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        let inserted = (after - before).max(0) as u64;
        debug!(
            batch = records.len(),
            inserted,
            updated = records.len() as u64 - inserted,
            "batch upserted"
        );
        Ok(inserted)
    }

    /// The most recent stored timestamp for `series_key`, if any.
    pub async fn read_latest_timestamp(
        &self,
        series_key: &str,
    ) -> StoreResult<Option<DateTime<Utc>>> {
        let raw: Option<String> =
            sqlx::query_scalar("SELECT MAX(timestamp) FROM records WHERE series_key = ?1")
                .bind(series_key)
                .fetch_one(&self.pool)
                .await?;
        raw.map(|s| parse_timestamp(&s)).transpose()
    }

    /// Number of stored rows for `series_key`.
    pub async fn count_records(&self, series_key: &str) -> StoreResult<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM records WHERE series_key = ?1")
                .bind(series_key)
                .fetch_one(&self.pool)
                .await?;
        Ok(count as u64)
    }

    /// All stored records for `series_key` with timestamps inside `range`,
    /// in chronological order.
    pub async fn read_range(
        &self,
        series_key: &str,
        range: &TimeRange,
    ) -> StoreResult<Vec<Record>> {
        let rows = sqlx::query(
            r#"
            SELECT series_key, timestamp, value, value_min, value_max, geo_id, geo_name, extra
            FROM records
            WHERE series_key = ?1 AND timestamp >= ?2 AND timestamp < ?3
            ORDER BY timestamp
            "#,
        )
        .bind(series_key)
        .bind(format_timestamp(&range.start()))
        .bind(format_timestamp(&range.end()))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(decode_row).collect()
    }
}

/// RFC 3339 with fixed seconds precision, so string order matches time order.
/// Sub-second precision is dropped: the providers report hourly or daily
/// observations, and two records inside the same second would collide on the
/// natural key anyway.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_timestamp(raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("timestamp {raw:?}: {e}")))
}

fn parse_decimal(raw: &str) -> StoreResult<Decimal> {
    raw.parse()
        .map_err(|e| StoreError::Corrupt(format!("decimal {raw:?}: {e}")))
}

fn decode_row(row: &SqliteRow) -> StoreResult<Record> {
    let timestamp = parse_timestamp(row.get("timestamp"))?;
    let value = parse_decimal(row.get("value"))?;
    let value_min = row
        .get::<Option<String>, _>("value_min")
        .as_deref()
        .map(parse_decimal)
        .transpose()?;
    let value_max = row
        .get::<Option<String>, _>("value_max")
        .as_deref()
        .map(parse_decimal)
        .transpose()?;
    let extra: BTreeMap<String, String> = serde_json::from_str(row.get("extra"))
        .map_err(|e| StoreError::Corrupt(format!("extra column: {e}")))?;

    Ok(Record {
        series_key: row.get("series_key"),
        timestamp,
        value,
        value_min,
        value_max,
        geo_id: row.get("geo_id"),
        geo_name: row.get("geo_name"),
        extra,
    })
}
