use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::parse_project_id;
use crate::dto::{StartPollingRequest, StopPollingRequest};
use crate::error::ApiError;
use crate::services::{PollingService, RunRecord, StopOutcome};
use crate::state::AppState;

/// Claim the project and run the requested iterations in the background
pub async fn start_polling(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StartPollingRequest>,
) -> Result<(StatusCode, Json<RunRecord>), ApiError> {
    let project_id = parse_project_id(&request.project_id)?;
    let iterations = request
        .iterations
        .unwrap_or(state.worker_config.default_iterations.value);

    tracing::info!(project_id = %project_id, iterations, "Start polling requested");

    let record = PollingService::start(&state, project_id, iterations)
        .await
        .map_err(|e| {
            tracing::warn!(project_id = %project_id, error = %e, "Polling start refused");
            ApiError::from(e)
        })?;

    Ok((StatusCode::ACCEPTED, Json(record)))
}

pub async fn stop_polling(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StopPollingRequest>,
) -> Result<Json<StopOutcome>, ApiError> {
    let project_id = parse_project_id(&request.project_id)?;
    let outcome = PollingService::stop(&state, project_id).await?;
    Ok(Json(outcome))
}

pub async fn list_runs(State(state): State<Arc<AppState>>) -> Json<Vec<RunRecord>> {
    Json(state.runs.list().await)
}

pub async fn get_run(
    State(state): State<Arc<AppState>>,
    Path(run_id): Path<String>,
) -> Result<Json<RunRecord>, ApiError> {
    let run_id: Uuid = run_id
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid run ID format"))?;

    state
        .runs
        .get(run_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Run not found: {}", run_id)))
}
