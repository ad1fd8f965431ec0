use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Whether a schedule is a proven optimum or a time-boxed best effort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ScheduleQuality {
    /// The solver proved optimality.
    Optimal,
    /// The time limit expired; this is the best incumbent found.
    TimeLimited,
}

/// Regulation market awards for one period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegulationAward {
    /// Capacity reserved for regulation up, MW.
    pub up_capacity_mw: f64,
    /// Capacity reserved for regulation down, MW.
    pub down_capacity_mw: f64,
    /// Energy actually deployed upward (discharging), MW.
    pub up_deployed_mw: f64,
    /// Energy actually deployed downward (charging), MW.
    pub down_deployed_mw: f64,
}

/// One period of the dispatch plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulePeriod {
    /// Start of the period, UTC.
    pub timestamp: DateTime<Utc>,
    /// Energy price the period cleared at, $/MWh.
    pub price: f64,
    /// Grid draw, MW.
    pub charge_mw: f64,
    /// Grid injection, MW.
    pub discharge_mw: f64,
    /// Stored energy at the *end* of the period, MWh.
    pub state_of_charge_mwh: f64,
    /// Net market revenue earned in the period, $.
    pub revenue: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regulation: Option<RegulationAward>,
}

/// The immutable result of one optimization run.
///
/// Constructed once by the extractor and only read afterwards; persistence
/// and reporting layers never mutate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub quality: ScheduleQuality,
    /// Period length in hours; uniform across the horizon.
    pub period_hours: f64,
    /// Stored energy before the first period, MWh.
    pub initial_soc_mwh: f64,
    /// Periods in timestamp order, one per horizon period.
    pub periods: Vec<SchedulePeriod>,
    /// Sum of per-period revenue over the horizon, $.
    pub total_profit: f64,
    pub optimizer_version: String,
}

impl Schedule {
    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.periods.first().map(|p| p.timestamp)
    }

    /// Exclusive end of the horizon.
    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.periods.last().map(|p| {
            p.timestamp + chrono::Duration::milliseconds((self.period_hours * 3_600_000.0) as i64)
        })
    }

    /// Stored energy after the last period, MWh.
    pub fn final_soc_mwh(&self) -> f64 {
        self.periods
            .last()
            .map(|p| p.state_of_charge_mwh)
            .unwrap_or(self.initial_soc_mwh)
    }

    /// Gross charge-side energy (market charging plus regulation-down
    /// deployment), MWh.
    pub fn charged_energy_mwh(&self) -> f64 {
        self.periods
            .iter()
            .map(|p| {
                (p.charge_mw + p.regulation.map(|r| r.down_deployed_mw).unwrap_or(0.0))
                    * self.period_hours
            })
            .sum()
    }

    /// Gross discharge-side energy (market discharging plus regulation-up
    /// deployment), MWh.
    pub fn discharged_energy_mwh(&self) -> f64 {
        self.periods
            .iter()
            .map(|p| {
                (p.discharge_mw + p.regulation.map(|r| r.up_deployed_mw).unwrap_or(0.0))
                    * self.period_hours
            })
            .sum()
    }

    /// Equivalent full cycles used over the horizon, measured on the
    /// charge side the way the cycle-limit constraint is.
    pub fn cycles_used(&self, capacity_mwh: f64) -> f64 {
        self.charged_energy_mwh() / capacity_mwh
    }
}
