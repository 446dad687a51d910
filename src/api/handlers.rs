use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::engine::types::{Context, Run, WorkflowDefinition};

use super::AppState;
use super::errors::AppError;

// --- Request/Response types ---

#[derive(Deserialize)]
pub struct TriggerRequest {
    /// Initial context for the run.
    #[serde(default)]
    pub context: Context,
}

#[derive(Serialize)]
pub struct ConnectorInfo {
    pub step_type: String,
    pub description: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

// --- Handlers ---

/// POST /api/workflows
pub async fn create_workflow(
    State(state): State<Arc<AppState>>,
    Json(workflow): Json<WorkflowDefinition>,
) -> Result<(StatusCode, Json<WorkflowDefinition>), AppError> {
    let created = state.engine.create_workflow(&workflow).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/workflows
pub async fn list_workflows(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<WorkflowDefinition>>, AppError> {
    Ok(Json(state.engine.list_workflows().await?))
}

/// GET /api/workflows/{id}
pub async fn get_workflow(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<WorkflowDefinition>, AppError> {
    Ok(Json(state.engine.get_workflow(&id).await?))
}

/// PUT /api/workflows/{id}
pub async fn update_workflow(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(workflow): Json<WorkflowDefinition>,
) -> Result<Json<WorkflowDefinition>, AppError> {
    if workflow.id != id {
        return Err(AppError::BadRequest(format!(
            "workflow id '{}' does not match path '{}'",
            workflow.id, id
        )));
    }
    Ok(Json(state.engine.update_workflow(&workflow).await?))
}

/// DELETE /api/workflows/{id}
pub async fn delete_workflow(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let deleted = state.engine.delete_workflow(&id).await?;
    Ok(Json(serde_json::json!({ "deleted": deleted })))
}

/// POST /api/workflows/{id}/trigger
pub async fn trigger_workflow(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<TriggerRequest>,
) -> Result<(StatusCode, Json<Run>), AppError> {
    let run = state.engine.trigger(&id, req.context).await?;
    Ok((StatusCode::ACCEPTED, Json(run)))
}

/// GET /api/runs/{id}
pub async fn get_run(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Run>, AppError> {
    Ok(Json(state.engine.get_run(&id).await?))
}

/// GET /api/workflows/{id}/runs
pub async fn list_workflow_runs(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Run>>, AppError> {
    Ok(Json(state.engine.list_runs(Some(&id)).await?))
}

/// GET /api/connectors
pub async fn list_connectors(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let connectors: Vec<ConnectorInfo> = state
        .engine
        .registry()
        .list()
        .iter()
        .map(|(name, desc)| ConnectorInfo {
            step_type: name.to_string(),
            description: desc.to_string(),
        })
        .collect();

    let total = connectors.len();
    Json(serde_json::json!({
        "connectors": connectors,
        "total": total,
    }))
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
