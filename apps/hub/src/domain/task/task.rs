use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value_objects::{TaskPriority, TaskStatus, TransitionError};

/// Input for creating a task
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinition {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub required_capabilities: Vec<String>,
}

impl TaskDefinition {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_capabilities(mut self, capabilities: Vec<String>) -> Self {
        self.required_capabilities = capabilities;
        self
    }
}

/// Requested status change for a task
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusUpdate {
    pub status: TaskStatus,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
    /// Explicit duration to record on a terminal transition
    #[serde(default)]
    pub actual_duration_ms: Option<u64>,
    /// Agent to bind when moving to `assigned`
    #[serde(default)]
    pub agent_id: Option<String>,
}

impl TaskStatusUpdate {
    pub fn new(status: TaskStatus) -> Self {
        Self {
            status,
            result: None,
            error: None,
            actual_duration_ms: None,
            agent_id: None,
        }
    }

    pub fn assign_to(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: Some(agent_id.into()),
            ..Self::new(TaskStatus::Assigned)
        }
    }

    pub fn completed(result: serde_json::Value) -> Self {
        Self {
            result: Some(result),
            ..Self::new(TaskStatus::Completed)
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(TaskStatus::Failed)
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.actual_duration_ms = Some(duration_ms);
        self
    }
}

/// Task aggregate
///
/// # Invariants
/// - Status transitions follow [`TaskStatus::can_transition_to`]
/// - `actual_duration_ms` is set exactly when the task is terminal
/// - `retry_count` only grows, one step per `Failed -> Pending` retry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    id: Uuid,
    title: String,
    description: String,
    priority: TaskPriority,
    required_capabilities: Vec<String>,
    goal_id: Option<Uuid>,
    assigned_agent: Option<String>,
    status: TaskStatus,
    retry_count: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    actual_duration_ms: Option<u64>,
    result: Option<serde_json::Value>,
    error: Option<String>,
}

impl Task {
    /// Creates a pending, standalone task with a fresh id
    pub fn new(definition: TaskDefinition) -> Self {
        Self::build(definition, None)
    }

    /// Creates a pending task belonging to a goal
    pub(crate) fn for_goal(definition: TaskDefinition, goal_id: Uuid) -> Self {
        Self::build(definition, Some(goal_id))
    }

    fn build(definition: TaskDefinition, goal_id: Option<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: definition.title,
            description: definition.description,
            priority: definition.priority,
            required_capabilities: definition.required_capabilities,
            goal_id,
            assigned_agent: None,
            status: TaskStatus::Pending,
            retry_count: 0,
            created_at: now,
            updated_at: now,
            actual_duration_ms: None,
            result: None,
            error: None,
        }
    }

    /// Applies a status update
    ///
    /// Agent existence and capacity are checked by the registry before
    /// this is called; here only the state machine and retry bound apply.
    ///
    /// # Returns
    /// * `Ok(TaskStatus)` - The status held before the update
    /// * `Err(TransitionError)` - The task is left untouched
    pub fn apply(
        &mut self,
        update: TaskStatusUpdate,
        max_retries: u32,
    ) -> Result<TaskStatus, TransitionError> {
        let previous = self.status;
        let next = update.status;

        if !previous.can_transition_to(next) {
            return Err(TransitionError::Invalid {
                from: previous,
                to: next,
            });
        }

        if previous == TaskStatus::Failed && self.retry_count >= max_retries {
            return Err(TransitionError::RetryLimit { limit: max_retries });
        }

        let now = Utc::now();

        if previous == TaskStatus::Failed {
            self.retry_count += 1;
            self.assigned_agent = None;
            self.actual_duration_ms = None;
            self.result = None;
            self.error = None;
        }

        if let Some(agent_id) = update.agent_id {
            self.assigned_agent = Some(agent_id);
        }

        if next.is_terminal() {
            let elapsed = (now - self.created_at).num_milliseconds().max(0) as u64;
            self.actual_duration_ms = Some(update.actual_duration_ms.unwrap_or(elapsed));
            self.result = update.result;
            self.error = update.error;
        }

        self.status = next;
        self.updated_at = now;

        Ok(previous)
    }

    // ===== Getters =====

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn priority(&self) -> TaskPriority {
        self.priority
    }

    pub fn required_capabilities(&self) -> &[String] {
        &self.required_capabilities
    }

    pub fn goal_id(&self) -> Option<Uuid> {
        self.goal_id
    }

    pub fn assigned_agent(&self) -> Option<&str> {
        self.assigned_agent.as_deref()
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn actual_duration_ms(&self) -> Option<u64> {
        self.actual_duration_ms
    }

    pub fn result(&self) -> Option<&serde_json::Value> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started_task() -> Task {
        let mut task = Task::new(TaskDefinition::new("crawl"));
        task.apply(TaskStatusUpdate::new(TaskStatus::InProgress), 3)
            .unwrap();
        task
    }

    #[test]
    fn new_task_is_pending() {
        let task = Task::new(TaskDefinition::new("crawl").with_priority(TaskPriority::High));

        assert_eq!(task.status(), TaskStatus::Pending);
        assert_eq!(task.retry_count(), 0);
        assert_eq!(task.priority(), TaskPriority::High);
        assert!(task.actual_duration_ms().is_none());
        assert_eq!(task.created_at(), task.updated_at());
    }

    #[test]
    fn completion_records_supplied_duration_and_result() {
        let mut task = started_task();

        let previous = task
            .apply(
                TaskStatusUpdate::completed(serde_json::json!({"pages": 12})).with_duration(500),
                3,
            )
            .unwrap();

        assert_eq!(previous, TaskStatus::InProgress);
        assert_eq!(task.status(), TaskStatus::Completed);
        assert_eq!(task.actual_duration_ms(), Some(500));
        assert_eq!(task.result(), Some(&serde_json::json!({"pages": 12})));
    }

    #[test]
    fn terminal_transition_measures_elapsed_time_without_duration() {
        let mut task = started_task();
        task.apply(TaskStatusUpdate::failed("timeout"), 3).unwrap();

        assert!(task.actual_duration_ms().is_some());
        assert_eq!(task.error(), Some("timeout"));
    }

    #[test]
    fn invalid_transition_leaves_task_untouched() {
        let mut task = Task::new(TaskDefinition::new("crawl"));
        let before = task.clone();

        let err = task
            .apply(TaskStatusUpdate::new(TaskStatus::Completed), 3)
            .unwrap_err();

        assert_eq!(
            err,
            TransitionError::Invalid {
                from: TaskStatus::Pending,
                to: TaskStatus::Completed
            }
        );
        assert_eq!(task, before);
    }

    #[test]
    fn retry_resets_outcome_and_counts() {
        let mut task = started_task();
        task.apply(TaskStatusUpdate::failed("boom"), 3).unwrap();
        task.apply(TaskStatusUpdate::new(TaskStatus::Pending), 3)
            .unwrap();

        assert_eq!(task.status(), TaskStatus::Pending);
        assert_eq!(task.retry_count(), 1);
        assert!(task.actual_duration_ms().is_none());
        assert!(task.error().is_none());
    }

    #[test]
    fn retry_bound_is_enforced() {
        let mut task = started_task();
        task.apply(TaskStatusUpdate::failed("boom"), 1).unwrap();
        task.apply(TaskStatusUpdate::new(TaskStatus::Pending), 1)
            .unwrap();
        task.apply(TaskStatusUpdate::new(TaskStatus::InProgress), 1)
            .unwrap();
        task.apply(TaskStatusUpdate::failed("boom again"), 1).unwrap();

        let err = task
            .apply(TaskStatusUpdate::new(TaskStatus::Pending), 1)
            .unwrap_err();

        assert_eq!(err, TransitionError::RetryLimit { limit: 1 });
        assert_eq!(task.status(), TaskStatus::Failed);
        assert_eq!(task.retry_count(), 1);
    }

    #[test]
    fn assignment_binds_agent() {
        let mut task = Task::new(TaskDefinition::new("crawl"));
        task.apply(TaskStatusUpdate::assign_to("agent-a"), 3).unwrap();

        assert_eq!(task.status(), TaskStatus::Assigned);
        assert_eq!(task.assigned_agent(), Some("agent-a"));
    }
}
