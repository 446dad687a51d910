mod errors;
pub mod handlers;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, put};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::WorkflowEngine;
use crate::connectors::ConnectorRegistry;
use crate::storage::json_store::JsonStore;

/// Shared application state accessible by all handlers.
pub struct AppState {
    pub engine: WorkflowEngine,
}

/// Build the API router for a given engine.
pub fn router(engine: WorkflowEngine) -> Router {
    let state = Arc::new(AppState { engine });

    Router::new()
        .route("/api/workflows", post(handlers::create_workflow))
        .route("/api/workflows", get(handlers::list_workflows))
        .route("/api/workflows/{id}", get(handlers::get_workflow))
        .route("/api/workflows/{id}", put(handlers::update_workflow))
        .route("/api/workflows/{id}", delete(handlers::delete_workflow))
        .route(
            "/api/workflows/{id}/trigger",
            post(handlers::trigger_workflow),
        )
        .route("/api/workflows/{id}/runs", get(handlers::list_workflow_runs))
        .route("/api/runs/{id}", get(handlers::get_run))
        .route("/api/connectors", get(handlers::list_connectors))
        .route("/health", get(handlers::health))
        .with_state(state)
}

/// Start the REST API server.
pub async fn serve(host: &str, port: u16, data_dir: PathBuf, max_body: usize) -> Result<()> {
    let registry = Arc::new(ConnectorRegistry::with_builtins()?);
    let storage = Arc::new(JsonStore::new(data_dir));
    let engine = WorkflowEngine::new(registry, storage);

    let app = router(engine)
        .layer(DefaultBodyLimit::max(max_body))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("ZapFlow API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
