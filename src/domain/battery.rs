use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;

/// Physical parameters of the storage asset.
///
/// Validated once per run and then shared read-only across the pipeline;
/// the formulator treats every field as immutable configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryParameters {
    /// Nameplate energy capacity in MWh.
    pub capacity_mwh: f64,
    /// Maximum grid draw while charging, MW.
    pub max_charge_mw: f64,
    /// Maximum grid injection while discharging, MW.
    pub max_discharge_mw: f64,
    /// Round-trip efficiency in (0, 1].
    pub round_trip_efficiency: f64,
    /// Stored energy at the start of the horizon, MWh.
    pub initial_soc_mwh: f64,
    /// Cap on gross throughput per horizon, in equivalent full cycles.
    /// `None` leaves throughput unconstrained.
    pub max_cycles: Option<f64>,
}

impl Default for BatteryParameters {
    fn default() -> Self {
        Self {
            capacity_mwh: 200.0,
            max_charge_mw: 100.0,
            max_discharge_mw: 100.0,
            round_trip_efficiency: 0.9,
            initial_soc_mwh: 100.0,
            max_cycles: Some(1.0),
        }
    }
}

impl BatteryParameters {
    /// Checks every physical invariant, naming the offending field.
    ///
    /// Runs before any model is built so that a bad configuration never
    /// reaches a solver.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if !self.capacity_mwh.is_finite() || self.capacity_mwh <= 0.0 {
            return Err(ScheduleError::invalid_parameter(
                "capacity_mwh",
                format!("must be a positive finite value, got {}", self.capacity_mwh),
            ));
        }
        if !self.max_charge_mw.is_finite() || self.max_charge_mw <= 0.0 {
            return Err(ScheduleError::invalid_parameter(
                "max_charge_mw",
                format!("must be a positive finite value, got {}", self.max_charge_mw),
            ));
        }
        if !self.max_discharge_mw.is_finite() || self.max_discharge_mw <= 0.0 {
            return Err(ScheduleError::invalid_parameter(
                "max_discharge_mw",
                format!("must be a positive finite value, got {}", self.max_discharge_mw),
            ));
        }
        if !self.round_trip_efficiency.is_finite()
            || self.round_trip_efficiency <= 0.0
            || self.round_trip_efficiency > 1.0
        {
            return Err(ScheduleError::invalid_parameter(
                "round_trip_efficiency",
                format!("must lie in (0, 1], got {}", self.round_trip_efficiency),
            ));
        }
        if !self.initial_soc_mwh.is_finite()
            || self.initial_soc_mwh < 0.0
            || self.initial_soc_mwh > self.capacity_mwh
        {
            return Err(ScheduleError::invalid_parameter(
                "initial_soc_mwh",
                format!(
                    "must lie in [0, {}], got {}",
                    self.capacity_mwh, self.initial_soc_mwh
                ),
            ));
        }
        if let Some(cycles) = self.max_cycles {
            if !cycles.is_finite() || cycles < 0.0 {
                return Err(ScheduleError::invalid_parameter(
                    "max_cycles",
                    format!("must be a non-negative finite value, got {}", cycles),
                ));
            }
        }
        Ok(())
    }

    /// One-way conversion efficiency: √(round-trip).
    ///
    /// The round-trip loss is split equally across the charge and the
    /// discharge leg. Other splits (all-on-one-leg) are equally valid
    /// conventions; this one is applied everywhere in this crate.
    pub fn one_way_efficiency(&self) -> f64 {
        self.round_trip_efficiency.sqrt()
    }

    /// State-of-charge transition over one period.
    ///
    /// `soc + charge·Δ·√η − discharge·Δ/√η`, with Δ in hours and powers in
    /// MW. Pure arithmetic; keeping the result inside [0, capacity] is the
    /// formulator's constraint, not this function's job.
    pub fn transition(
        &self,
        soc_mwh: f64,
        charge_mw: f64,
        discharge_mw: f64,
        duration_hours: f64,
    ) -> f64 {
        let eta = self.one_way_efficiency();
        soc_mwh + charge_mw * duration_hours * eta - discharge_mw * duration_hours / eta
    }
}
