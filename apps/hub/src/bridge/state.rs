use serde::Serialize;

use crate::domain::agent::Agent;
use crate::domain::goal::Goal;
use crate::domain::metrics::SystemMetrics;
use crate::domain::task::Task;
use crate::transport::ConnectionState;

/// Externally observed view of the session
///
/// Everything except `is_loading` and `error` is a pure function of the
/// registry contents and the channel state at the last re-derivation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservableState {
    pub agents: Vec<Agent>,
    pub tasks: Vec<Task>,
    pub goals: Vec<Goal>,
    pub metrics: SystemMetrics,
    pub queue_size: usize,
    pub connection: ConnectionState,
    pub is_loading: bool,
    /// Message of the last failed operation, cleared by the next success
    pub error: Option<String>,
}

impl ObservableState {
    pub fn agent(&self, agent_id: &str) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == agent_id)
    }

    pub fn task(&self, task_id: uuid::Uuid) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id() == task_id)
    }

    pub fn goal(&self, goal_id: uuid::Uuid) -> Option<&Goal> {
        self.goals.iter().find(|g| g.id() == goal_id)
    }
}
