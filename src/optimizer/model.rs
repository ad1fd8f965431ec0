//! Solver-independent model representation.
//!
//! The formulator builds a [`DispatchModel`] and any backend implementing
//! [`crate::solver::SolverBackend`] consumes it; neither side sees the
//! other's types. The objective is always maximized.

/// Handle to a decision variable within one [`DispatchModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(pub(crate) usize);

impl VarId {
    /// Zero-based creation index, also the position of this variable's
    /// value in a solution vector.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// The domain of a decision variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VarKind {
    Continuous { lower: f64, upper: f64 },
    Binary,
}

#[derive(Debug, Clone)]
pub struct VarDef {
    pub name: String,
    pub kind: VarKind,
    /// Coefficient in the maximized objective.
    pub objective: f64,
}

/// Comparison between a constraint's linear expression and its bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Eq,
    Le,
    Ge,
}

/// A named linear constraint `Σ coeff·var <relation> rhs`.
///
/// Names identify the period and role (`soc_balance[3]`, `cycle_limit_charge`)
/// so infeasibility reports can cite what failed.
#[derive(Debug, Clone)]
pub struct LinearConstraint {
    pub name: String,
    pub terms: Vec<(VarId, f64)>,
    pub relation: Relation,
    pub rhs: f64,
}

#[derive(Debug, Clone, Default)]
pub struct DispatchModel {
    variables: Vec<VarDef>,
    constraints: Vec<LinearConstraint>,
}

impl DispatchModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_var(
        &mut self,
        name: impl Into<String>,
        lower: f64,
        upper: f64,
        objective: f64,
    ) -> VarId {
        let id = VarId(self.variables.len());
        self.variables.push(VarDef {
            name: name.into(),
            kind: VarKind::Continuous { lower, upper },
            objective,
        });
        id
    }

    pub fn add_binary(&mut self, name: impl Into<String>, objective: f64) -> VarId {
        let id = VarId(self.variables.len());
        self.variables.push(VarDef {
            name: name.into(),
            kind: VarKind::Binary,
            objective,
        });
        id
    }

    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        terms: Vec<(VarId, f64)>,
        relation: Relation,
        rhs: f64,
    ) {
        self.constraints.push(LinearConstraint {
            name: name.into(),
            terms,
            relation,
            rhs,
        });
    }

    pub fn variables(&self) -> &[VarDef] {
        &self.variables
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    pub fn num_vars(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn has_binaries(&self) -> bool {
        self.variables
            .iter()
            .any(|v| matches!(v.kind, VarKind::Binary))
    }

    /// Inclusive bounds of a variable, `(0, 1)` for binaries.
    pub fn bounds(&self, var: VarId) -> (f64, f64) {
        match self.variables[var.0].kind {
            VarKind::Continuous { lower, upper } => (lower, upper),
            VarKind::Binary => (0.0, 1.0),
        }
    }
}
