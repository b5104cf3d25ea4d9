use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::agent::AgentStatus;
use super::task::TaskStatus;

/// Domain events emitted by the registry on every successful mutation
///
/// Consumers match exhaustively on this closed set rather than on
/// event-name strings.
///
/// # Example
/// ```
/// use orchestration_hub::domain::events::OrchestrationEvent;
/// use uuid::Uuid;
///
/// let event = OrchestrationEvent::GoalCompleted { goal_id: Uuid::new_v4() };
/// assert_eq!(event.name(), "goal_completed");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrchestrationEvent {
    /// Fired when an agent joins the registry
    AgentRegistered { agent_id: String },
    /// Fired when an agent is removed
    AgentUnregistered { agent_id: String },
    /// Fired on every agent status update
    AgentStatusChanged {
        agent_id: String,
        from: AgentStatus,
        to: AgentStatus,
    },
    /// Fired when a task enters the queue
    TaskCreated {
        task_id: Uuid,
        goal_id: Option<Uuid>,
    },
    /// Fired on every accepted task status update
    TaskStatusChanged {
        task_id: Uuid,
        from: TaskStatus,
        to: TaskStatus,
    },
    /// Fired when a goal is created
    GoalCreated { goal_id: Uuid },
    /// Fired when a goal is expanded into tasks
    GoalDecomposed { goal_id: Uuid, task_ids: Vec<Uuid> },
    /// Fired when derived goal progress changes
    GoalProgressed { goal_id: Uuid, progress: u8 },
    /// Fired once, when a goal first reaches 100%
    GoalCompleted { goal_id: Uuid },
}

impl OrchestrationEvent {
    /// Stable snake_case name, matching the serialized tag
    pub fn name(&self) -> &'static str {
        match self {
            OrchestrationEvent::AgentRegistered { .. } => "agent_registered",
            OrchestrationEvent::AgentUnregistered { .. } => "agent_unregistered",
            OrchestrationEvent::AgentStatusChanged { .. } => "agent_status_changed",
            OrchestrationEvent::TaskCreated { .. } => "task_created",
            OrchestrationEvent::TaskStatusChanged { .. } => "task_status_changed",
            OrchestrationEvent::GoalCreated { .. } => "goal_created",
            OrchestrationEvent::GoalDecomposed { .. } => "goal_decomposed",
            OrchestrationEvent::GoalProgressed { .. } => "goal_progressed",
            OrchestrationEvent::GoalCompleted { .. } => "goal_completed",
        }
    }
}
