//! Schedule persistence.
//!
//! Every completed run is kept so operators can audit what was committed
//! to the market. The in-memory store backs tests and single-process
//! deployments; the `db` feature adds a SQLite-backed one.

use std::cmp::Reverse;
use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Schedule, ScheduleQuality};

#[cfg(feature = "db")]
pub mod sqlite;
#[cfg(feature = "db")]
pub use sqlite::SqliteScheduleStore;

/// One line of the run ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSummary {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub quality: ScheduleQuality,
    pub total_profit: f64,
    pub periods: usize,
}

impl From<&Schedule> for ScheduleSummary {
    fn from(schedule: &Schedule) -> Self {
        Self {
            id: schedule.id,
            created_at: schedule.created_at,
            start: schedule.start(),
            end: schedule.end(),
            quality: schedule.quality,
            total_profit: schedule.total_profit,
            periods: schedule.periods.len(),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn put(&self, schedule: &Schedule) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<Schedule>>;
    /// Summaries of every stored run, newest first.
    async fn list(&self) -> Result<Vec<ScheduleSummary>>;
}

#[derive(Default)]
pub struct MemoryScheduleStore {
    schedules: RwLock<HashMap<Uuid, Schedule>>,
}

impl MemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScheduleStore for MemoryScheduleStore {
    async fn put(&self, schedule: &Schedule) -> Result<()> {
        self.schedules.write().insert(schedule.id, schedule.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Schedule>> {
        Ok(self.schedules.read().get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<ScheduleSummary>> {
        let mut summaries: Vec<ScheduleSummary> =
            self.schedules.read().values().map(Into::into).collect();
        summaries.sort_by_key(|s| Reverse(s.created_at));
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use crate::domain::SchedulePeriod;

    fn schedule(created_at: DateTime<Utc>, profit: f64) -> Schedule {
        let start = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
        Schedule {
            id: Uuid::new_v4(),
            created_at,
            quality: ScheduleQuality::Optimal,
            period_hours: 1.0,
            initial_soc_mwh: 50.0,
            periods: vec![SchedulePeriod {
                timestamp: start,
                price: 10.0,
                charge_mw: 0.0,
                discharge_mw: 5.0,
                state_of_charge_mwh: 44.0,
                revenue: profit,
                regulation: None,
            }],
            total_profit: profit,
            optimizer_version: "test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_put_then_get_round_trips() {
        let store = MemoryScheduleStore::new();
        let schedule = schedule(Utc::now(), 50.0);
        store.put(&schedule).await.unwrap();

        let loaded = store.get(schedule.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, schedule.id);
        assert_eq!(loaded.total_profit, 50.0);
    }

    #[tokio::test]
    async fn test_get_unknown_id_is_none() {
        let store = MemoryScheduleStore::new();
        assert!(store.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let store = MemoryScheduleStore::new();
        let base = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();
        let older = schedule(base, 1.0);
        let newer = schedule(base + Duration::hours(2), 2.0);
        store.put(&older).await.unwrap();
        store.put(&newer).await.unwrap();

        let summaries = store.list().await.unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].id, newer.id);
        assert_eq!(summaries[1].id, older.id);
        assert_eq!(summaries[0].periods, 1);
    }
}
