// Read-only registry snapshot

use serde::{Deserialize, Serialize};

use crate::domain::agent::Agent;
use crate::domain::goal::Goal;
use crate::domain::metrics::SystemMetrics;
use crate::domain::task::Task;

/// Point-in-time copy of everything the registry holds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub agents: Vec<Agent>,
    pub tasks: Vec<Task>,
    pub goals: Vec<Goal>,
    pub queue_size: usize,
}

impl SystemStatus {
    pub fn metrics(&self) -> SystemMetrics {
        SystemMetrics::derive(&self.agents, &self.tasks)
    }
}
