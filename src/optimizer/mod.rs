//! Profit-maximizing dispatch over a price horizon.
//!
//! The pipeline is validate, formulate, solve, extract: battery parameters
//! are checked, the horizon becomes a linear (or mixed-integer) model, a
//! [`SolverBackend`](crate::solver::SolverBackend) produces variable values,
//! and those are settled into a [`Schedule`](crate::domain::Schedule).

mod extract;
pub mod formulation;
pub mod model;

pub use formulation::{
    DispatchVars, Formulation, FormulationOptions, MutualExclusion, RegulationVars,
};
pub use model::{DispatchModel, LinearConstraint, Relation, VarDef, VarId, VarKind};

use std::fmt;
use std::time::Instant;

use crate::domain::{BatteryParameters, Horizon, Schedule};
use crate::error::ScheduleError;
use crate::solver::{MicrolpBackend, SolveOptions, SolverBackend, SolverError};

/// Schedules a battery against a price horizon through a pluggable solver.
pub struct DispatchOptimizer {
    backend: Box<dyn SolverBackend>,
    formulation: FormulationOptions,
    solve: SolveOptions,
}

impl DispatchOptimizer {
    pub fn new(backend: Box<dyn SolverBackend>) -> Self {
        Self::with_options(backend, FormulationOptions::default(), SolveOptions::default())
    }

    pub fn with_options(
        backend: Box<dyn SolverBackend>,
        formulation: FormulationOptions,
        solve: SolveOptions,
    ) -> Self {
        Self {
            backend,
            formulation,
            solve,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Computes the profit-maximizing schedule for one horizon.
    ///
    /// Solver failures come back with the horizon attached so callers can
    /// tell which window could not be scheduled.
    pub fn optimize(
        &self,
        battery: &BatteryParameters,
        horizon: &Horizon,
    ) -> Result<Schedule, ScheduleError> {
        battery.validate()?;
        let formulation = formulation::build(battery, horizon, &self.formulation)?;
        tracing::debug!(
            periods = horizon.len(),
            variables = formulation.model.num_vars(),
            constraints = formulation.model.num_constraints(),
            binaries = formulation.uses_binaries(),
            "dispatch model built"
        );

        let started = Instant::now();
        let solution = self
            .backend
            .solve(&formulation.model, &self.solve)
            .map_err(|err| self.solver_error(horizon, err))?;

        let schedule =
            extract::extract_schedule(battery, horizon, &formulation, &solution, self.backend.name());
        tracing::info!(
            schedule_id = %schedule.id,
            status = %solution.status,
            total_profit = schedule.total_profit,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "schedule optimized"
        );
        Ok(schedule)
    }

    fn solver_error(&self, horizon: &Horizon, err: SolverError) -> ScheduleError {
        match err {
            SolverError::Infeasible => ScheduleError::Infeasible {
                start: horizon.start(),
                end: horizon.end(),
                detail: "no dispatch satisfies the battery constraints".to_string(),
            },
            SolverError::Timeout(limit) => ScheduleError::Timeout {
                start: horizon.start(),
                end: horizon.end(),
                limit_secs: limit.as_secs(),
            },
            // A bounded-variable profit model cannot be unbounded; if the
            // backend claims otherwise the model itself is broken.
            SolverError::Unbounded => {
                ScheduleError::Solver("solver reported an unbounded objective".to_string())
            }
            SolverError::Backend(msg) => ScheduleError::Solver(msg),
        }
    }
}

impl Default for DispatchOptimizer {
    fn default() -> Self {
        Self::new(Box::new(MicrolpBackend::new()))
    }
}

impl fmt::Debug for DispatchOptimizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchOptimizer")
            .field("backend", &self.backend.name())
            .field("formulation", &self.formulation)
            .field("solve", &self.solve)
            .finish()
    }
}
