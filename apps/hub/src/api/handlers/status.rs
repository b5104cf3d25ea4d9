use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use tokio::sync::watch;
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::bridge::ObservableState;
use crate::domain::agent::Agent;
use crate::domain::goal::Goal;
use crate::domain::metrics::SystemMetrics;
use crate::domain::task::Task;
use crate::registry::RegistryError;
use crate::transport::ConnectionState;

/// Read side of the bridge's observable snapshot
pub type SnapshotState = watch::Receiver<ObservableState>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub connection: ConnectionState,
}

/// Health check endpoint
///
/// GET /health
pub async fn health_check(State(snapshot): State<SnapshotState>) -> Json<HealthResponse> {
    let connection = snapshot.borrow().connection.clone();
    Json(HealthResponse {
        status: "ok",
        connection,
    })
}

/// Full observable snapshot
///
/// GET /api/status
pub async fn get_status(State(snapshot): State<SnapshotState>) -> Json<ObservableState> {
    Json(snapshot.borrow().clone())
}

/// Derived system metrics
///
/// GET /api/metrics
pub async fn get_metrics(State(snapshot): State<SnapshotState>) -> Json<SystemMetrics> {
    Json(snapshot.borrow().metrics.clone())
}

/// GET /api/agents/:id
pub async fn get_agent(
    State(snapshot): State<SnapshotState>,
    Path(id): Path<String>,
) -> Result<Json<Agent>, ApiError> {
    let agent = snapshot
        .borrow()
        .agent(&id)
        .cloned()
        .ok_or_else(|| RegistryError::agent_not_found(&id))?;

    Ok(Json(agent))
}

/// GET /api/tasks/:id
pub async fn get_task(
    State(snapshot): State<SnapshotState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Task>, ApiError> {
    let task = snapshot
        .borrow()
        .task(id)
        .cloned()
        .ok_or_else(|| RegistryError::task_not_found(id))?;

    Ok(Json(task))
}

/// GET /api/goals/:id
pub async fn get_goal(
    State(snapshot): State<SnapshotState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Goal>, ApiError> {
    let goal = snapshot
        .borrow()
        .goal(id)
        .cloned()
        .ok_or_else(|| RegistryError::goal_not_found(id))?;

    Ok(Json(goal))
}
