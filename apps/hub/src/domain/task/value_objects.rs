use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Lifecycle status of a task
///
/// # Status Transitions
/// ```text
/// Pending -> Assigned -> InProgress -> Completed
///    |          |            └-------> Failed --(retry)--> Pending
///    └----------┴------------┴-------> Cancelled
/// ```
/// `Pending -> InProgress` is also allowed for unassigned work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting in the queue
    Pending,
    /// Bound to an agent but not started
    Assigned,
    /// Being executed
    InProgress,
    /// Finished successfully
    Completed,
    /// Finished with an error
    Failed,
    /// Abandoned before finishing
    Cancelled,
}

impl TaskStatus {
    /// Checks if a transition from current status to next status is valid
    ///
    /// # Valid Transitions
    /// - Pending -> Assigned | InProgress | Cancelled
    /// - Assigned -> InProgress | Cancelled
    /// - InProgress -> Completed | Failed | Cancelled
    /// - Failed -> Pending (retry, subject to the retry bound)
    ///
    /// # Example
    /// ```
    /// use orchestration_hub::domain::task::TaskStatus;
    ///
    /// assert!(TaskStatus::Pending.can_transition_to(TaskStatus::Assigned));
    /// assert!(!TaskStatus::Pending.can_transition_to(TaskStatus::Completed));
    /// ```
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Pending, Assigned)
                | (Pending, InProgress)
                | (Assigned, InProgress)
                | (InProgress, Completed)
                | (InProgress, Failed)
                | (Pending, Cancelled)
                | (Assigned, Cancelled)
                | (InProgress, Cancelled)
                | (Failed, Pending)
        )
    }

    /// Completed, failed and cancelled tasks are terminal
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    /// Whether a task in this status occupies a slot on its agent
    pub fn is_open(&self) -> bool {
        matches!(self, TaskStatus::Assigned | TaskStatus::InProgress)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Assigned => write!(f, "assigned"),
            TaskStatus::InProgress => write!(f, "in_progress"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "assigned" => Ok(TaskStatus::Assigned),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            "cancelled" => Ok(TaskStatus::Cancelled),
            other => Err(format!("Unknown task status: {}", other)),
        }
    }
}

/// Scheduling priority of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

/// Rejected task status change
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Invalid state transition from {from} to {to}")]
    Invalid { from: TaskStatus, to: TaskStatus },

    #[error("Retry limit of {limit} reached")]
    RetryLimit { limit: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use TaskStatus::*;

    #[test]
    fn forward_chain_is_valid() {
        assert!(Pending.can_transition_to(Assigned));
        assert!(Assigned.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Failed));
    }

    #[test]
    fn unassigned_work_can_start_directly() {
        assert!(Pending.can_transition_to(InProgress));
    }

    #[test]
    fn non_terminal_states_can_be_cancelled() {
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Assigned.can_transition_to(Cancelled));
        assert!(InProgress.can_transition_to(Cancelled));
    }

    #[test]
    fn failed_can_only_retry() {
        assert!(Failed.can_transition_to(Pending));
        assert!(!Failed.can_transition_to(InProgress));
        assert!(!Failed.can_transition_to(Cancelled));
    }

    #[test]
    fn cannot_skip_to_terminal() {
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Failed));
        assert!(!Assigned.can_transition_to(Completed));
    }

    #[test]
    fn absorbing_states_reject_everything() {
        for next in [Pending, Assigned, InProgress, Completed, Failed, Cancelled] {
            assert!(!Completed.can_transition_to(next));
            assert!(!Cancelled.can_transition_to(next));
        }
    }

    #[test]
    fn no_backwards_moves() {
        assert!(!InProgress.can_transition_to(Pending));
        assert!(!InProgress.can_transition_to(Assigned));
        assert!(!Assigned.can_transition_to(Pending));
    }

    #[test]
    fn terminal_and_open_flags() {
        assert!(Completed.is_terminal());
        assert!(Failed.is_terminal());
        assert!(Cancelled.is_terminal());
        assert!(!InProgress.is_terminal());

        assert!(Assigned.is_open());
        assert!(InProgress.is_open());
        assert!(!Pending.is_open());
    }

    #[test]
    fn status_display() {
        assert_eq!(Pending.to_string(), "pending");
        assert_eq!(InProgress.to_string(), "in_progress");
        assert_eq!(serde_json::to_string(&InProgress).unwrap(), "\"in_progress\"");
        assert_eq!("cancelled".parse::<TaskStatus>(), Ok(Cancelled));
    }

    #[test]
    fn priority_orders_low_to_critical() {
        assert!(TaskPriority::Low < TaskPriority::Medium);
        assert!(TaskPriority::High < TaskPriority::Critical);
        assert_eq!(TaskPriority::default(), TaskPriority::Medium);
    }
}
