//! Profit-maximizing dispatch scheduling for grid-scale battery storage.
//!
//! Given an hourly price horizon and a battery's physical parameters, the
//! crate builds a linear (or, under negative prices, mixed-integer) model
//! of the charge/discharge decision, solves it, and returns a
//! [`Schedule`](domain::Schedule) of per-period setpoints with settled
//! revenue. Regulation market co-optimization and throughput limits ride
//! on the same model. An axum service wraps the pipeline for on-demand
//! runs.

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod optimizer;
pub mod prices;
pub mod report;
pub mod solver;
pub mod store;
pub mod telemetry;
pub mod workflow;

pub use domain::{BatteryParameters, Horizon, PricePoint, RegulationPrice, Schedule};
pub use error::ScheduleError;
pub use optimizer::{DispatchOptimizer, FormulationOptions, MutualExclusion};
pub use solver::{MicrolpBackend, SolveOptions, SolverBackend};
