//! Price data acquisition.

mod csv;

pub use self::csv::CsvPriceSource;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::Horizon;
use crate::error::ScheduleError;

/// Supplies the price horizon for a scheduling window.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Hourly energy (and, where offered, regulation) prices covering
    /// `[start, end)`. Every hour of the window must carry an energy price;
    /// regulation gaps mean the market was not offered that hour.
    async fn price_series(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Horizon, ScheduleError>;
}
