#![cfg(feature = "db")]

use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use uuid::Uuid;

use crate::domain::{Schedule, ScheduleQuality};
use crate::store::{ScheduleStore, ScheduleSummary};

const CREATE_TABLE: &str = "\
CREATE TABLE IF NOT EXISTS schedules (
    id            TEXT PRIMARY KEY,
    created_at    TEXT NOT NULL,
    start_at      TEXT,
    end_at        TEXT,
    quality       TEXT NOT NULL,
    total_profit  REAL NOT NULL,
    periods       INTEGER NOT NULL,
    body          TEXT NOT NULL
)";

/// SQLite-backed run ledger. Summary columns are denormalized so listing
/// does not deserialize every schedule body.
pub struct SqliteScheduleStore {
    pool: SqlitePool,
}

impl SqliteScheduleStore {
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("parsing sqlite url {url}"))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| format!("opening sqlite database {url}"))?;
        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl ScheduleStore for SqliteScheduleStore {
    async fn put(&self, schedule: &Schedule) -> Result<()> {
        let body = serde_json::to_string(schedule)?;
        sqlx::query(
            "INSERT OR REPLACE INTO schedules \
             (id, created_at, start_at, end_at, quality, total_profit, periods, body) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(schedule.id.to_string())
        .bind(schedule.created_at)
        .bind(schedule.start())
        .bind(schedule.end())
        .bind(schedule.quality.to_string())
        .bind(schedule.total_profit)
        .bind(schedule.periods.len() as i64)
        .bind(body)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Schedule>> {
        let row = sqlx::query("SELECT body FROM schedules WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let body: String = row.try_get("body")?;
                Ok(Some(serde_json::from_str(&body)?))
            }
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<ScheduleSummary>> {
        let rows = sqlx::query(
            "SELECT id, created_at, start_at, end_at, quality, total_profit, periods \
             FROM schedules ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let id: String = row.try_get("id")?;
                let quality: String = row.try_get("quality")?;
                let periods: i64 = row.try_get("periods")?;
                Ok(ScheduleSummary {
                    id: Uuid::parse_str(&id)?,
                    created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
                    start: row.try_get("start_at")?,
                    end: row.try_get("end_at")?,
                    quality: quality
                        .parse::<ScheduleQuality>()
                        .with_context(|| format!("unknown schedule quality {quality:?}"))?,
                    total_profit: row.try_get("total_profit")?,
                    periods: periods as usize,
                })
            })
            .collect()
    }
}
