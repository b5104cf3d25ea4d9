//! Status API integration tests
//!
//! These tests verify the read-only HTTP surface over the bridge's
//! observable snapshot:
//! - Health and connection state
//! - Full snapshot and metrics
//! - Entity lookups and 404s for unknown ids

mod common;

use std::rc::Rc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use orchestration_hub::api;
use orchestration_hub::bridge::{SyncBridge, TracingNotifier};
use orchestration_hub::domain::agent::AgentRegistration;
use orchestration_hub::domain::goal::GoalDefinition;
use orchestration_hub::domain::task::TaskDefinition;
use orchestration_hub::registry::OrchestrationContext;
use serde_json::Value;
use tower::util::ServiceExt; // for oneshot

/// Setup a bridge and a router reading its snapshot
fn setup_app() -> (SyncBridge, Router) {
    let (channel, _connector) = common::channel(10);
    let bridge = SyncBridge::new(
        OrchestrationContext::default(),
        channel,
        Rc::new(TracingNotifier),
    );
    let app = api::router(bridge.subscribe());
    (bridge, app)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_health_check() {
    let (_bridge, app) = setup_app();

    let (status, json) = get(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["connection"]["status"], "disconnected");
}

#[tokio::test]
async fn test_status_reflects_latest_snapshot() {
    let (bridge, app) = setup_app();
    bridge
        .register_agent(AgentRegistration::new("crawler", 2).with_id("crawler-1"))
        .unwrap();
    bridge.create_task(TaskDefinition::new("fetch")).unwrap();

    let (status, json) = get(app, "/api/status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["agents"].as_array().unwrap().len(), 1);
    assert_eq!(json["tasks"][0]["status"], "pending");
    assert_eq!(json["queueSize"], 1);
    assert_eq!(json["isLoading"], false);
    assert!(json["error"].is_null());
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (bridge, app) = setup_app();
    bridge.create_task(TaskDefinition::new("one")).unwrap();
    bridge.create_task(TaskDefinition::new("two")).unwrap();

    let (status, json) = get(app, "/api/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["totalTasks"], 2);
    assert_eq!(json["queueSize"], 2);
    assert_eq!(json["averageTaskDuration"], 0.0);
}

#[tokio::test]
async fn test_entity_lookups() {
    let (bridge, app) = setup_app();
    bridge
        .register_agent(AgentRegistration::new("crawler", 2).with_id("crawler-1"))
        .unwrap();
    let task = bridge.create_task(TaskDefinition::new("fetch")).unwrap();
    let goal = bridge
        .create_goal(GoalDefinition::new("launch").with_objectives(["a", "b"]))
        .unwrap();

    let (status, json) = get(app.clone(), "/api/agents/crawler-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "crawler");

    let (status, json) = get(app.clone(), &format!("/api/tasks/{}", task.id())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["title"], "fetch");

    let (status, json) = get(app, &format!("/api/goals/{}", goal.id())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["progress"], 0);
}

#[tokio::test]
async fn test_unknown_ids_return_not_found() {
    let (_bridge, app) = setup_app();

    let (status, json) = get(app.clone(), "/api/agents/ghost").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "Agent not found: ghost");

    let (status, _) = get(app.clone(), &format!("/api/tasks/{}", uuid::Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(app, &format!("/api/goals/{}", uuid::Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_task_id_is_rejected() {
    let (_bridge, app) = setup_app();

    let (status, _) = get(app, "/api/tasks/not-a-uuid").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}
