use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use tracing::info;

use super::AppState;
use crate::ApiError;
use remote::{ListFilter, WorkflowSummary};

pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<ListFilter>,
) -> Result<Json<Vec<WorkflowSummary>>, ApiError> {
    let workflows = state.service.store().list_workflows(&filter).await?;
    Ok(Json(workflows))
}

pub async fn get(Path(id): Path<String>, State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let workflow = state.service.store().fetch_workflow(&id).await?;
    Ok(Json(workflow))
}

pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let created = state.service.store().create_workflow(payload).await?;
    let id = created.get("id").and_then(serde_json::Value::as_str);
    info!(id = ?id, "workflow created");
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn delete(Path(id): Path<String>, State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.service.store().delete_workflow(&id).await?;
    info!(%id, "workflow deleted");
    Ok(StatusCode::NO_CONTENT)
}
