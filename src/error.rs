use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors produced by the dispatch pipeline.
///
/// Every variant carries enough context for the caller to act without
/// re-running the pipeline: the offending parameter, the timestamps that
/// broke the horizon, or the bounds of the horizon that could not be
/// scheduled. Nothing here is retried internally; infeasibility in
/// particular is a legitimate business answer, not a fault.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("empty horizon: at least one pricing period is required")]
    EmptyHorizon,

    #[error("discontinuous horizon: expected period {expected} after {previous}, found {found}")]
    DiscontinuousHorizon {
        previous: DateTime<Utc>,
        expected: DateTime<Utc>,
        found: DateTime<Utc>,
    },

    #[error("missing price data for period {period}")]
    MissingData { period: DateTime<Utc> },

    #[error("no feasible schedule for horizon {start}..{end}: {detail}")]
    Infeasible {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        detail: String,
    },

    #[error("solver exhausted its time limit of {limit_secs}s without a feasible schedule for horizon {start}..{end}")]
    Timeout {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit_secs: u64,
    },

    #[error("solver failure: {0}")]
    Solver(String),
}

impl ScheduleError {
    pub fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    /// True for errors the caller can fix by correcting its input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidParameter { .. }
                | Self::EmptyHorizon
                | Self::DiscontinuousHorizon { .. }
                | Self::MissingData { .. }
        )
    }
}
