use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::error::ScheduleError;
use crate::workflow::WorkflowError;

/// Everything a handler can fail with, mapped onto the HTTP surface.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("validation failed: {0}")]
    ValidationError(String),

    /// The window admits no feasible dispatch. A business answer, not a
    /// fault, so the solver's reason is passed through to the caller.
    #[error("infeasible: {0}")]
    Infeasible(String),

    #[error("solver timed out: {0}")]
    Timeout(String),

    #[error("internal error: {0}")]
    InternalError(String),
}

/// Body of every error reply. The `error` field is a stable machine-readable
/// tag; `message` is for humans.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::Infeasible(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NotFound",
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::ValidationError(_) => "ValidationError",
            ApiError::Infeasible(_) => "Infeasible",
            ApiError::Timeout(_) => "Timeout",
            ApiError::InternalError(_) => "InternalServerError",
        }
    }

    /// What the caller gets to see. Internal detail stays in the logs.
    fn public_message(&self) -> String {
        match self {
            ApiError::InternalError(_) => "internal error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::InternalError(_) => tracing::error!(error = %self, "request failed"),
            ApiError::Timeout(_) => tracing::warn!(error = %self, "solve timed out"),
            _ => tracing::debug!(error = %self, "request rejected"),
        }

        let body = ErrorBody {
            error: self.error_type().to_string(),
            message: self.public_message(),
            details: None,
        };
        (self.status_code(), Json(body)).into_response()
    }
}

impl From<ScheduleError> for ApiError {
    fn from(error: ScheduleError) -> Self {
        let message = error.to_string();
        match error {
            ScheduleError::InvalidParameter { .. }
            | ScheduleError::EmptyHorizon
            | ScheduleError::DiscontinuousHorizon { .. }
            | ScheduleError::MissingData { .. } => ApiError::BadRequest(message),
            ScheduleError::Infeasible { .. } => ApiError::Infeasible(message),
            ScheduleError::Timeout { .. } => ApiError::Timeout(message),
            ScheduleError::Solver(_) => ApiError::InternalError(message),
        }
    }
}

impl From<WorkflowError> for ApiError {
    fn from(error: WorkflowError) -> Self {
        match error {
            WorkflowError::Schedule(e) => e.into(),
            WorkflowError::Store(e) => ApiError::InternalError(e.to_string()),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        ApiError::InternalError(error.to_string())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(errors.to_string())
    }
}
