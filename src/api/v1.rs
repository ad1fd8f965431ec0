use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::error::ApiError;
use crate::workflow::{self, AppState};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/optimize", post(optimize))
        .route("/schedules", get(list_schedules))
        .route("/schedules/:id", get(get_schedule))
        .route("/healthz", get(healthz))
        .with_state(state)
}

pub async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}

#[derive(Debug, Deserialize, Validate)]
pub struct OptimizeRequest {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Overrides the configured starting level for this run only.
    #[validate(range(min = 0.0))]
    pub initial_state_of_charge_mwh: Option<f64>,
}

pub async fn optimize(
    State(state): State<AppState>,
    Json(req): Json<OptimizeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    let schedule = workflow::run_optimization(
        &state,
        req.start,
        req.end,
        req.initial_state_of_charge_mwh,
    )
    .await?;
    Ok((StatusCode::OK, Json(schedule)))
}

pub async fn list_schedules(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let summaries = state.store.list().await?;
    Ok(Json(summaries))
}

pub async fn get_schedule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    match state.store.get(id).await? {
        Some(schedule) => Ok(Json(schedule)),
        None => Err(ApiError::NotFound(format!("schedule {id}"))),
    }
}
