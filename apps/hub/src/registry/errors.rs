use thiserror::Error;
use uuid::Uuid;

use crate::domain::task::{TaskStatus, TransitionError};

/// Kind of entity a registry error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Agent,
    Task,
    Goal,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Agent => write!(f, "Agent"),
            EntityKind::Task => write!(f, "Task"),
            EntityKind::Goal => write!(f, "Goal"),
        }
    }
}

/// Errors that can occur in registry operations
///
/// A failed operation never changes registry state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },

    #[error("Task {task_id} reached its retry limit of {limit}")]
    RetryLimitExceeded { task_id: Uuid, limit: u32 },

    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: EntityKind, id: String },

    #[error("Agent {agent_id} is at capacity ({capacity} open tasks)")]
    AgentAtCapacity { agent_id: String, capacity: u32 },

    #[error("Goal {0} has already been decomposed")]
    GoalAlreadyDecomposed(Uuid),

    #[error("Orchestration context has been shut down")]
    ShutDown,
}

impl RegistryError {
    pub fn agent_not_found(id: impl Into<String>) -> Self {
        RegistryError::NotFound {
            kind: EntityKind::Agent,
            id: id.into(),
        }
    }

    pub fn task_not_found(id: Uuid) -> Self {
        RegistryError::NotFound {
            kind: EntityKind::Task,
            id: id.to_string(),
        }
    }

    pub fn goal_not_found(id: Uuid) -> Self {
        RegistryError::NotFound {
            kind: EntityKind::Goal,
            id: id.to_string(),
        }
    }

    pub(crate) fn from_transition(task_id: Uuid, err: TransitionError) -> Self {
        match err {
            TransitionError::Invalid { from, to } => RegistryError::InvalidTransition { from, to },
            TransitionError::RetryLimit { limit } => {
                RegistryError::RetryLimitExceeded { task_id, limit }
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::NotFound { .. })
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;
