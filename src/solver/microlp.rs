use std::collections::BTreeMap;

use microlp::{ComparisonOp, LinearExpr, OptimizationDirection, Problem};

use crate::optimizer::model::{DispatchModel, Relation, VarKind};
use crate::solver::{SolveOptions, SolverBackend, SolverError, SolverSolution, SolverStatus};

/// Default backend: the `microlp` simplex + branch & bound solver.
///
/// Pure Rust, so the crate builds without native solver libraries. One
/// `microlp::Problem` is created per `solve` call and dropped with it,
/// which keeps concurrent solves fully independent.
#[derive(Debug, Clone, Copy, Default)]
pub struct MicrolpBackend;

impl MicrolpBackend {
    pub fn new() -> Self {
        Self
    }
}

impl SolverBackend for MicrolpBackend {
    fn name(&self) -> &'static str {
        "microlp"
    }

    fn solve(
        &self,
        model: &DispatchModel,
        options: &SolveOptions,
    ) -> Result<SolverSolution, SolverError> {
        let mut problem = Problem::new(OptimizationDirection::Maximize);

        let vars: Vec<microlp::Variable> = model
            .variables()
            .iter()
            .map(|def| match def.kind {
                VarKind::Continuous { lower, upper } => problem.add_var(def.objective, (lower, upper)),
                VarKind::Binary => problem.add_binary_var(def.objective),
            })
            .collect();

        for constraint in model.constraints() {
            // microlp rejects repeated variables within one expression, so
            // coefficients are merged per variable first.
            let mut merged: BTreeMap<usize, f64> = BTreeMap::new();
            for (var, coeff) in &constraint.terms {
                *merged.entry(var.index()).or_insert(0.0) += coeff;
            }
            let mut expr = LinearExpr::empty();
            for (idx, coeff) in merged {
                expr.add(vars[idx], coeff);
            }
            let op = match constraint.relation {
                Relation::Eq => ComparisonOp::Eq,
                Relation::Le => ComparisonOp::Le,
                Relation::Ge => ComparisonOp::Ge,
            };
            problem.add_constraint(expr, op, constraint.rhs);
        }

        let mut solve_options = microlp::SolveOptions::default();
        solve_options.time_limit = options.time_limit;
        solve_options.mip_gap = options.mip_gap;

        let outcome = problem.solve_with(solve_options).map_err(|e| match e {
            microlp::Error::Infeasible => SolverError::Infeasible,
            microlp::Error::Unbounded => SolverError::Unbounded,
            other => SolverError::Backend(other.to_string()),
        })?;

        let solution = outcome
            .into_solution()
            .map_err(|_| SolverError::Timeout(options.time_limit.unwrap_or_default()))?;

        let status = match (solution.status(), solution.termination_reason()) {
            (microlp::SolutionStatus::Optimal, _) => SolverStatus::Optimal,
            (_, microlp::TerminationReason::TimeLimit) => SolverStatus::TimeLimitReached,
            _ => SolverStatus::Feasible,
        };

        let values = vars.iter().map(|&v| solution.var_value(v)).collect();

        Ok(SolverSolution {
            status,
            objective: solution.objective(),
            values,
        })
    }
}
