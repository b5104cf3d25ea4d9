// API layer module (adapters for controllers)
// Follows Hexagonal Architecture - API is an adapter
//
// Read-only: every route serves the bridge's latest observable snapshot.

pub mod errors;
pub mod handlers;

use axum::{routing::get, Router};

use handlers::status::{self, SnapshotState};

/// Builds the status router over a snapshot receiver
pub fn router(snapshot: SnapshotState) -> Router {
    Router::new()
        .route("/health", get(status::health_check))
        .route("/api/status", get(status::get_status))
        .route("/api/metrics", get(status::get_metrics))
        .route("/api/agents/:id", get(status::get_agent))
        .route("/api/tasks/:id", get(status::get_task))
        .route("/api/goals/:id", get(status::get_goal))
        .with_state(snapshot)
}
