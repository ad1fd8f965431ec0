//! CSV run reports.
//!
//! Two files per run, overwritten in place: `schedule.csv` with one row
//! per period, and `summary.csv` with the run ledger line. Downstream
//! settlement tooling consumes these, so the column order is part of the
//! contract.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{BatteryParameters, Schedule};

#[derive(Debug, Serialize)]
struct ScheduleRow {
    timestamp: DateTime<Utc>,
    price: f64,
    charge_mw: f64,
    discharge_mw: f64,
    regulation_up_capacity_mw: Option<f64>,
    regulation_down_capacity_mw: Option<f64>,
    regulation_up_deployed_mw: Option<f64>,
    regulation_down_deployed_mw: Option<f64>,
    state_of_charge_mwh: f64,
    revenue: f64,
}

#[derive(Debug, Serialize)]
struct SummaryRow {
    run_id: String,
    created_at: DateTime<Utc>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    quality: String,
    total_profit: f64,
    cycles_used: f64,
    final_soc_mwh: f64,
    optimizer_version: String,
}

/// Paths of the files one run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub schedule: PathBuf,
    pub summary: PathBuf,
}

pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn write(&self, battery: &BatteryParameters, schedule: &Schedule) -> Result<ReportPaths> {
        fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("creating output directory {}", self.output_dir.display()))?;

        let schedule_path = self.output_dir.join("schedule.csv");
        let mut writer = csv::Writer::from_path(&schedule_path)
            .with_context(|| format!("writing {}", schedule_path.display()))?;
        for period in &schedule.periods {
            writer.serialize(ScheduleRow {
                timestamp: period.timestamp,
                price: period.price,
                charge_mw: period.charge_mw,
                discharge_mw: period.discharge_mw,
                regulation_up_capacity_mw: period.regulation.map(|r| r.up_capacity_mw),
                regulation_down_capacity_mw: period.regulation.map(|r| r.down_capacity_mw),
                regulation_up_deployed_mw: period.regulation.map(|r| r.up_deployed_mw),
                regulation_down_deployed_mw: period.regulation.map(|r| r.down_deployed_mw),
                state_of_charge_mwh: period.state_of_charge_mwh,
                revenue: period.revenue,
            })?;
        }
        writer.flush()?;

        let summary_path = self.output_dir.join("summary.csv");
        let mut writer = csv::Writer::from_path(&summary_path)
            .with_context(|| format!("writing {}", summary_path.display()))?;
        writer.serialize(SummaryRow {
            run_id: schedule.id.to_string(),
            created_at: schedule.created_at,
            start: schedule.start(),
            end: schedule.end(),
            quality: schedule.quality.to_string(),
            total_profit: schedule.total_profit,
            cycles_used: schedule.cycles_used(battery.capacity_mwh),
            final_soc_mwh: schedule.final_soc_mwh(),
            optimizer_version: schedule.optimizer_version.clone(),
        })?;
        writer.flush()?;

        tracing::debug!(
            schedule = %schedule_path.display(),
            summary = %summary_path.display(),
            "wrote run reports"
        );
        Ok(ReportPaths {
            schedule: schedule_path,
            summary: summary_path,
        })
    }
}
