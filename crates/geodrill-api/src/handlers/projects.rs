use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use geodrill_core::models::{ChatMessage, NewProject, ProjectUpdate};

use super::parse_project_id;
use crate::dto::{
    CreateProjectRequest, MessagesQuery, PathResponse, ProjectResponse, UpdateProjectRequest,
};
use crate::error::ApiError;
use crate::state::AppState;

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub async fn create_project(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<ProjectResponse>), ApiError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("Project name must not be empty"));
    }

    let interval = request
        .polling_interval
        .unwrap_or(state.worker_config.default_polling_interval.value);

    let mut new = NewProject::new(name).with_polling_interval(interval);
    if let Some(url) = non_empty(request.external_api_url) {
        new = new.with_external_api_url(url);
    }

    tracing::info!(name = %new.name, polling_interval = interval, "Creating project");

    let project = state.projects.create_project(&new).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to create project");
        ApiError::from(e)
    })?;

    Ok((StatusCode::CREATED, Json(project.into())))
}

pub async fn list_projects(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ProjectResponse>>, ApiError> {
    let projects = state.projects.list_projects().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to list projects");
        ApiError::from(e)
    })?;

    Ok(Json(projects.into_iter().map(ProjectResponse::from).collect()))
}

pub async fn get_project(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
) -> Result<Json<ProjectResponse>, ApiError> {
    let id = parse_project_id(&project_id)?;

    let project = state
        .projects
        .get_project(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Project not found: {}", id)))?;

    Ok(Json(project.into()))
}

pub async fn update_project(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
    Json(request): Json<UpdateProjectRequest>,
) -> Result<Json<ProjectResponse>, ApiError> {
    let id = parse_project_id(&project_id)?;

    let mut update = ProjectUpdate::default();

    if let Some(name) = request.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(ApiError::bad_request("Project name must not be empty"));
        }
        update.name = Some(name);
    }

    if let Some(url) = request.external_api_url {
        update.external_api_url = Some(non_empty(Some(url)));
    }

    update.polling_interval = request.polling_interval;

    if update.is_empty() {
        return Err(ApiError::bad_request("No fields to update"));
    }

    tracing::info!(project_id = %id, "Updating project");

    let project = state.projects.update_project(id, &update).await?;
    Ok(Json(project.into()))
}

/// Clear a project's path and metrics; refused while polling is active
pub async fn reset_project(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
) -> Result<Json<ProjectResponse>, ApiError> {
    let id = parse_project_id(&project_id)?;

    tracing::info!(project_id = %id, "Resetting project");

    let project = geodrill_poller::reset_project(state.projects.as_ref(), id).await?;
    Ok(Json(project.into()))
}

pub async fn get_project_path(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
) -> Result<Json<PathResponse>, ApiError> {
    let id = parse_project_id(&project_id)?;

    let project = state
        .projects
        .get_project(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Project not found: {}", id)))?;

    Ok(Json(PathResponse::from_project(&project)))
}

pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    let id = parse_project_id(&project_id)?;

    if state.projects.get_project(id).await?.is_none() {
        return Err(ApiError::not_found(format!("Project not found: {}", id)));
    }

    let mut messages = state.messages.list_messages(id).await?;
    if let Some(limit) = query.limit {
        let skip = messages.len().saturating_sub(limit);
        messages.drain(..skip);
    }

    Ok(Json(messages))
}
