//! Tests for the REST API surface, driven through the router with oneshot
//! requests.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use tower::ServiceExt;

use zapflow::WorkflowEngine;
use zapflow::api;
use zapflow::connectors::ConnectorRegistry;
use zapflow::storage::memory_store::MemoryStore;

fn app() -> Router {
    let registry = Arc::new(ConnectorRegistry::with_builtins().unwrap());
    let storage = Arc::new(MemoryStore::new());
    api::router(WorkflowEngine::new(registry, storage))
}

fn workflow_json() -> serde_json::Value {
    serde_json::json!({
        "id": "greet",
        "name": "Greeter",
        "entry_point": "hello",
        "steps": [
            {
                "id": "hello",
                "type": "log",
                "config": {"message": "hello ${ctx.name}"},
                "next_step_id": "bye"
            },
            {
                "id": "bye",
                "type": "log",
                "config": {"message": "bye"}
            }
        ]
    })
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<serde_json::Value>) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Poll GET /api/runs/{id} until the run is terminal, bounded at two seconds.
async fn wait_terminal(app: &Router, run_id: &str) -> serde_json::Value {
    for _ in 0..200 {
        let (status, run) = send(app, "GET", &format!("/api/runs/{}", run_id), None).await;
        assert_eq!(status, StatusCode::OK);
        let run_status = run["status"].as_str().unwrap();
        if run_status == "completed" || run_status == "failed" {
            return run;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("run {} did not reach a terminal status in time", run_id);
}

#[tokio::test]
async fn health_endpoint() {
    let app = app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn create_and_fetch_workflow() {
    let app = app();

    let (status, created) = send(&app, "POST", "/api/workflows", Some(workflow_json())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["id"], "greet");

    let (status, fetched) = send(&app, "GET", "/api/workflows/greet", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "Greeter");
    assert_eq!(fetched["steps"].as_array().unwrap().len(), 2);

    let (status, all) = send(&app, "GET", "/api/workflows", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_workflow_conflicts() {
    let app = app();
    send(&app, "POST", "/api/workflows", Some(workflow_json())).await;

    let (status, body) = send(&app, "POST", "/api/workflows", Some(workflow_json())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("greet"));
}

#[tokio::test]
async fn invalid_workflow_is_rejected() {
    let app = app();

    let mut invalid = workflow_json();
    invalid["entry_point"] = serde_json::json!("ghost");

    let (status, body) = send(&app, "POST", "/api/workflows", Some(invalid)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("ghost"));
}

#[tokio::test]
async fn path_traversal_workflow_id_is_rejected() {
    let app = app();

    let mut invalid = workflow_json();
    invalid["id"] = serde_json::json!("../../etc/cron.d/evil");

    let (status, body) = send(&app, "POST", "/api/workflows", Some(invalid)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("path-safe"));
}

#[tokio::test]
async fn missing_workflow_is_404() {
    let app = app();
    let (status, _) = send(&app, "GET", "/api/workflows/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_workflow() {
    let app = app();
    send(&app, "POST", "/api/workflows", Some(workflow_json())).await;

    let mut updated = workflow_json();
    updated["name"] = serde_json::json!("Renamed");
    let (status, body) = send(&app, "PUT", "/api/workflows/greet", Some(updated)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Renamed");

    // path/body id mismatch
    let (status, _) = send(&app, "PUT", "/api/workflows/other", Some(workflow_json())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_workflow_reports_outcome() {
    let app = app();
    send(&app, "POST", "/api/workflows", Some(workflow_json())).await;

    let (status, body) = send(&app, "DELETE", "/api/workflows/greet", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], serde_json::json!(true));

    let (_, body) = send(&app, "DELETE", "/api/workflows/greet", None).await;
    assert_eq!(body["deleted"], serde_json::json!(false));
}

#[tokio::test]
async fn trigger_returns_accepted_pending_run() {
    let app = app();
    send(&app, "POST", "/api/workflows", Some(workflow_json())).await;

    let (status, run) = send(
        &app,
        "POST",
        "/api/workflows/greet/trigger",
        Some(serde_json::json!({"context": {"name": "Ada"}})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(run["status"], "pending");
    assert_eq!(run["workflow_id"], "greet");
    assert_eq!(run["context"]["name"], "Ada");

    let run = wait_terminal(&app, run["id"].as_str().unwrap()).await;
    assert_eq!(run["status"], "completed");
    assert_eq!(run["steps"].as_array().unwrap().len(), 2);
    assert_eq!(run["context"]["log_message"], "bye");
}

#[tokio::test]
async fn trigger_unknown_workflow_is_404() {
    let app = app();
    let (status, _) = send(
        &app,
        "POST",
        "/api/workflows/nope/trigger",
        Some(serde_json::json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_runs_for_workflow() {
    let app = app();
    send(&app, "POST", "/api/workflows", Some(workflow_json())).await;

    let (_, run) = send(
        &app,
        "POST",
        "/api/workflows/greet/trigger",
        Some(serde_json::json!({})),
    )
    .await;
    wait_terminal(&app, run["id"].as_str().unwrap()).await;

    let (status, runs) = send(&app, "GET", "/api/workflows/greet/runs", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(runs.as_array().unwrap().len(), 1);
    assert_eq!(runs[0]["workflow_id"], "greet");
}

#[tokio::test]
async fn missing_run_is_404() {
    let app = app();
    let (status, body) = send(&app, "GET", "/api/runs/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn connectors_listing() {
    let app = app();
    let (status, body) = send(&app, "GET", "/api/connectors", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], serde_json::json!(3));

    let names: Vec<&str> = body["connectors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["step_type"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["delay", "log", "webhook"]);
}
