use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value_objects::AgentStatus;

/// Aggregate performance record carried with an agent
///
/// The registry treats this as opaque: it is supplied at registration
/// and reported back unchanged in snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPerformance {
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    pub average_duration_ms: f64,
    pub success_rate: f64,
}

/// Input for registering a new agent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRegistration {
    /// Explicit id; a UUID v4 string is generated when absent
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Maximum number of concurrent tasks
    pub capacity: u32,
    #[serde(default)]
    pub performance: AgentPerformance,
}

impl AgentRegistration {
    pub fn new(name: impl Into<String>, capacity: u32) -> Self {
        Self {
            id: None,
            name: name.into(),
            capabilities: Vec::new(),
            capacity,
            performance: AgentPerformance::default(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_capabilities(mut self, capabilities: Vec<String>) -> Self {
        self.capabilities = capabilities;
        self
    }
}

/// A registered worker agent capable of executing tasks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub status: AgentStatus,
    pub capabilities: Vec<String>,
    pub capacity: u32,
    pub performance: AgentPerformance,
    pub registered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Agent {
    /// Build an agent from registration data
    ///
    /// Capacity is floored at 1 so that every agent can hold at least
    /// one task.
    pub fn from_registration(registration: AgentRegistration) -> Self {
        let now = Utc::now();
        Self {
            id: registration
                .id
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            name: registration.name,
            status: AgentStatus::Idle,
            capabilities: registration.capabilities,
            capacity: registration.capacity.max(1),
            performance: registration.performance,
            registered_at: now,
            updated_at: now,
        }
    }

    pub(crate) fn set_status(&mut self, status: AgentStatus) -> AgentStatus {
        let previous = self.status;
        self.status = status;
        self.updated_at = Utc::now();
        previous
    }
}
