use chrono::{DateTime, Duration, Utc};
use itertools::Itertools;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;

/// One scheduling period's energy price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Start of the period, UTC.
    pub timestamp: DateTime<Utc>,
    /// Energy price in $/MWh.
    pub price: f64,
}

/// Regulation market clearing prices for one period, $/MW per hour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegulationPrice {
    pub up: f64,
    pub down: f64,
}

/// A contiguous, gapless, uniformly spaced price series.
///
/// Construction is the only place horizon invariants are checked; once a
/// `Horizon` exists the formulator may chain period dynamics without
/// re-validating. Regulation prices are optional per period: `None` means
/// the market is not offered in that period and the asset must not bid.
#[derive(Debug, Clone, PartialEq)]
pub struct Horizon {
    periods: Vec<PricePoint>,
    period_duration: Duration,
    regulation: Option<Vec<Option<RegulationPrice>>>,
}

impl Horizon {
    /// Builds a horizon, rejecting empty, duplicated, or gapped series.
    pub fn try_new(
        periods: Vec<PricePoint>,
        period_duration: Duration,
    ) -> Result<Self, ScheduleError> {
        if period_duration <= Duration::zero() {
            return Err(ScheduleError::invalid_parameter(
                "period_duration",
                format!("must be positive, got {period_duration}"),
            ));
        }
        if periods.is_empty() {
            return Err(ScheduleError::EmptyHorizon);
        }
        for (a, b) in periods.iter().tuple_windows() {
            let expected = a.timestamp + period_duration;
            if b.timestamp != expected {
                return Err(ScheduleError::DiscontinuousHorizon {
                    previous: a.timestamp,
                    expected,
                    found: b.timestamp,
                });
            }
        }
        Ok(Self {
            periods,
            period_duration,
            regulation: None,
        })
    }

    /// Convenience constructor for hourly markets.
    pub fn hourly(periods: Vec<PricePoint>) -> Result<Self, ScheduleError> {
        Self::try_new(periods, Duration::hours(1))
    }

    /// Attaches per-period regulation prices; the slice must align 1:1 with
    /// the energy periods.
    pub fn with_regulation(
        mut self,
        regulation: Vec<Option<RegulationPrice>>,
    ) -> Result<Self, ScheduleError> {
        if regulation.len() != self.periods.len() {
            return Err(ScheduleError::invalid_parameter(
                "regulation_prices",
                format!(
                    "expected {} periods to match the energy series, got {}",
                    self.periods.len(),
                    regulation.len()
                ),
            ));
        }
        self.regulation = Some(regulation);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        // try_new rejects empty series; kept for slice-like ergonomics.
        self.periods.is_empty()
    }

    pub fn periods(&self) -> &[PricePoint] {
        &self.periods
    }

    pub fn timestamp(&self, t: usize) -> DateTime<Utc> {
        self.periods[t].timestamp
    }

    pub fn price(&self, t: usize) -> f64 {
        self.periods[t].price
    }

    pub fn regulation_price(&self, t: usize) -> Option<RegulationPrice> {
        self.regulation.as_ref().and_then(|r| r[t])
    }

    pub fn has_regulation(&self) -> bool {
        self.regulation.is_some()
    }

    /// Start of the first period.
    pub fn start(&self) -> DateTime<Utc> {
        self.periods[0].timestamp
    }

    /// End of the last period (exclusive bound of the horizon).
    pub fn end(&self) -> DateTime<Utc> {
        self.periods[self.periods.len() - 1].timestamp + self.period_duration
    }

    pub fn period_duration(&self) -> Duration {
        self.period_duration
    }

    /// Period length in hours, the Δ of every energy term.
    pub fn duration_hours(&self) -> f64 {
        self.period_duration.num_milliseconds() as f64 / 3_600_000.0
    }

    pub fn min_price(&self) -> f64 {
        self.periods
            .iter()
            .map(|p| OrderedFloat(p.price))
            .min()
            .map(|p| p.into_inner())
            .unwrap_or_default()
    }

    /// Whether any period clears below zero. Negative prices are the one
    /// regime where a pure LP relaxation pays the asset to charge and
    /// discharge simultaneously, so the formulator keys its
    /// mutual-exclusion policy off this.
    pub fn has_negative_prices(&self) -> bool {
        self.min_price() < 0.0
    }
}
