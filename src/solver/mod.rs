//! Backend seam between the formulation and concrete LP/MIP solvers.
//!
//! The formulator produces a [`DispatchModel`]; a [`SolverBackend`] turns it
//! into numbers. Swapping solvers means implementing one trait, nothing in
//! the formulation changes.

pub mod microlp;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error;

use crate::optimizer::model::{DispatchModel, VarId};

pub use microlp::MicrolpBackend;

/// Per-call solver options.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolveOptions {
    /// Wall-clock budget for the solve; `None` means unlimited.
    pub time_limit: Option<Duration>,
    /// Relative MIP gap at which the search may stop with an incumbent.
    /// `0.0` requires a proven optimum.
    pub mip_gap: f64,
}

/// Outcome classification of a successful solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolverStatus {
    /// Optimality was proven.
    Optimal,
    /// A valid incumbent without an optimality proof (e.g. MIP gap stop).
    Feasible,
    /// The time limit expired while holding a usable incumbent.
    TimeLimitReached,
}

impl SolverStatus {
    pub fn is_proven_optimal(&self) -> bool {
        matches!(self, SolverStatus::Optimal)
    }
}

/// Variable assignment returned by a backend, indexed by [`VarId`]
/// creation order.
#[derive(Debug, Clone)]
pub struct SolverSolution {
    pub status: SolverStatus,
    pub objective: f64,
    pub values: Vec<f64>,
}

impl SolverSolution {
    pub fn value(&self, var: VarId) -> f64 {
        self.values[var.index()]
    }
}

/// Failures a backend can report.
///
/// `Infeasible` is a legitimate modeling outcome and is surfaced to callers
/// as such; it must never be converted into a panic or a retry here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolverError {
    #[error("problem is infeasible")]
    Infeasible,
    #[error("problem is unbounded")]
    Unbounded,
    #[error("time limit of {}s exhausted before any feasible point was found", .0.as_secs())]
    Timeout(Duration),
    #[error("solver backend failure: {0}")]
    Backend(String),
}

/// A mixed-integer/linear solver.
///
/// Implementations own their solver session for exactly the duration of one
/// `solve` call; nothing is shared between calls, so one backend value can
/// serve concurrent solves.
#[cfg_attr(test, mockall::automock)]
pub trait SolverBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn solve(
        &self,
        model: &DispatchModel,
        options: &SolveOptions,
    ) -> Result<SolverSolution, SolverError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::model::DispatchModel;

    // The backend must stay usable as a trait object behind Box/Arc.
    fn _assert_object_safe(_: &dyn SolverBackend) {}

    #[test]
    fn test_status_display_matches_reporting_vocabulary() {
        assert_eq!(SolverStatus::Optimal.to_string(), "OPTIMAL");
        assert_eq!(SolverStatus::Feasible.to_string(), "FEASIBLE");
        assert_eq!(
            SolverStatus::TimeLimitReached.to_string(),
            "TIME_LIMIT_REACHED"
        );
        assert!(SolverStatus::Optimal.is_proven_optimal());
        assert!(!SolverStatus::TimeLimitReached.is_proven_optimal());
    }

    #[test]
    fn test_solution_lookup_by_var_id() {
        let mut model = DispatchModel::new();
        let x = model.add_var("x", 0.0, 1.0, 1.0);
        let y = model.add_var("y", 0.0, 1.0, 1.0);
        let solution = SolverSolution {
            status: SolverStatus::Optimal,
            objective: 3.0,
            values: vec![1.0, 2.0],
        };
        assert_eq!(solution.value(x), 1.0);
        assert_eq!(solution.value(y), 2.0);
    }

    #[test]
    fn test_mock_backend_reports_infeasibility() {
        let mut backend = MockSolverBackend::new();
        backend.expect_name().return_const("mock");
        backend
            .expect_solve()
            .returning(|_, _| Err(SolverError::Infeasible));
        let err = backend
            .solve(&DispatchModel::new(), &SolveOptions::default())
            .unwrap_err();
        assert_eq!(err, SolverError::Infeasible);
    }
}
