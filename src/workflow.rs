//! Run orchestration: wire the configured pieces together and drive one
//! optimization from price loading through persistence and reporting.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::domain::{BatteryParameters, Schedule};
use crate::error::ScheduleError;
use crate::optimizer::DispatchOptimizer;
use crate::prices::{CsvPriceSource, PriceSource};
use crate::report::ReportWriter;
use crate::solver::MicrolpBackend;
use crate::store::{MemoryScheduleStore, ScheduleStore};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error("persistence failure: {0}")]
    Store(#[source] anyhow::Error),
}

#[derive(Clone)]
pub struct AppState {
    pub cfg: Config,
    pub battery: BatteryParameters,
    pub optimizer: Arc<DispatchOptimizer>,
    pub prices: Arc<dyn PriceSource>,
    pub store: Arc<dyn ScheduleStore>,
    pub reports: Arc<ReportWriter>,
}

impl AppState {
    pub async fn new(cfg: Config) -> Result<Self> {
        let battery = cfg.battery_parameters();
        battery.validate()?;

        let prices: Arc<dyn PriceSource> = Arc::new(CsvPriceSource::from_files(
            &cfg.prices.energy_file,
            cfg.prices.regulation_file.as_ref(),
        )?);
        let store = Self::build_store(&cfg).await?;
        let optimizer = Arc::new(DispatchOptimizer::with_options(
            Box::new(MicrolpBackend::new()),
            cfg.formulation_options(),
            cfg.solve_options(),
        ));
        let reports = Arc::new(ReportWriter::new(&cfg.output.directory));

        Ok(Self {
            cfg,
            battery,
            optimizer,
            prices,
            store,
            reports,
        })
    }

    async fn build_store(cfg: &Config) -> Result<Arc<dyn ScheduleStore>> {
        #[cfg(feature = "db")]
        {
            if let Some(url) = &cfg.db.url {
                return Ok(Arc::new(crate::store::SqliteScheduleStore::connect(url).await?));
            }
        }

        let _ = cfg;
        Ok(Arc::new(MemoryScheduleStore::new()))
    }
}

/// Runs one optimization: load prices, solve, persist, report.
///
/// The solve itself is CPU-bound and runs on the blocking pool. A failed
/// report write is logged but does not fail the run; the schedule is
/// already stored by then.
pub async fn run_optimization(
    state: &AppState,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    initial_soc_mwh: Option<f64>,
) -> Result<Schedule, WorkflowError> {
    let horizon = state.prices.price_series(start, end).await?;
    debug!(
        periods = horizon.len(),
        regulation = horizon.has_regulation(),
        "price horizon loaded"
    );

    let mut battery = state.battery.clone();
    if let Some(soc) = initial_soc_mwh {
        battery.initial_soc_mwh = soc;
    }

    let optimizer = Arc::clone(&state.optimizer);
    let solve_battery = battery.clone();
    let schedule = tokio::task::spawn_blocking(move || {
        optimizer.optimize(&solve_battery, &horizon)
    })
    .await
    .map_err(|err| ScheduleError::Solver(format!("solver task failed: {err}")))??;

    state.store.put(&schedule).await.map_err(WorkflowError::Store)?;
    debug!(schedule_id = %schedule.id, "schedule persisted");

    if let Err(err) = state.reports.write(&battery, &schedule) {
        warn!(error = %err, "failed to write run reports");
    }

    Ok(schedule)
}
