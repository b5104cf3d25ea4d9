use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::task::TaskPriority;

/// Input for creating a goal
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Planned sub-objectives, expanded into tasks by decomposition
    #[serde(default)]
    pub objectives: Vec<String>,
    #[serde(default)]
    pub priority: TaskPriority,
}

impl GoalDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_objectives<I, S>(mut self, objectives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.objectives = objectives.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    #[default]
    Active,
    Completed,
}

/// Outcome of a progress recomputation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub previous: u8,
    pub current: u8,
    /// True only on the recomputation that first sees every task completed
    pub completed_now: bool,
}

impl ProgressUpdate {
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

/// Goal aggregate
///
/// # Invariants
/// - `progress` is derived from constituent tasks, never set directly
/// - `task_ids` keeps decomposition order
/// - `completed_at` is set at most once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    id: Uuid,
    name: String,
    description: String,
    objectives: Vec<String>,
    priority: TaskPriority,
    status: GoalStatus,
    progress: u8,
    task_ids: Vec<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl Goal {
    pub fn new(definition: GoalDefinition) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: definition.name,
            description: definition.description,
            objectives: definition.objectives,
            priority: definition.priority,
            status: GoalStatus::Active,
            progress: 0,
            task_ids: Vec::new(),
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn is_decomposed(&self) -> bool {
        !self.task_ids.is_empty()
    }

    pub(crate) fn attach_tasks(&mut self, task_ids: &[Uuid]) {
        self.task_ids.extend_from_slice(task_ids);
        self.updated_at = Utc::now();
    }

    /// Recomputes progress from the number of completed constituent tasks
    ///
    /// progress = round(completed / total * 100); a goal without tasks
    /// stays at 0.
    pub(crate) fn record_progress(&mut self, completed: usize) -> ProgressUpdate {
        let previous = self.progress;
        let total = self.task_ids.len();

        let current = if total == 0 {
            0
        } else {
            ((completed.min(total) as f64 / total as f64) * 100.0).round() as u8
        };

        self.progress = current;
        if current != previous {
            self.updated_at = Utc::now();
        }

        // Rounding can reach 100 before the last task finishes
        let completed_now = total > 0 && completed >= total && self.completed_at.is_none();
        if completed_now {
            self.status = GoalStatus::Completed;
            self.completed_at = Some(Utc::now());
        }

        ProgressUpdate {
            previous,
            current,
            completed_now,
        }
    }

    // ===== Getters =====

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn objectives(&self) -> &[String] {
        &self.objectives
    }

    pub fn priority(&self) -> TaskPriority {
        self.priority
    }

    pub fn status(&self) -> GoalStatus {
        self.status
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn task_ids(&self) -> &[Uuid] {
        &self.task_ids
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goal_with_tasks(count: usize) -> Goal {
        let mut goal = Goal::new(GoalDefinition::new("launch"));
        let ids: Vec<Uuid> = (0..count).map(|_| Uuid::new_v4()).collect();
        goal.attach_tasks(&ids);
        goal
    }

    #[test]
    fn new_goal_starts_at_zero() {
        let goal = Goal::new(GoalDefinition::new("launch").with_objectives(["a", "b"]));

        assert_eq!(goal.progress(), 0);
        assert_eq!(goal.status(), GoalStatus::Active);
        assert_eq!(goal.objectives().len(), 2);
        assert!(!goal.is_decomposed());
    }

    #[test]
    fn progress_rounds_to_nearest_percent() {
        let mut goal = goal_with_tasks(3);

        assert_eq!(goal.record_progress(1).current, 33);
        assert_eq!(goal.record_progress(2).current, 67);
    }

    #[test]
    fn rounded_hundred_is_not_completion() {
        let mut goal = goal_with_tasks(200);

        let update = goal.record_progress(199);

        assert_eq!(update.current, 100);
        assert!(!update.completed_now);
        assert_eq!(goal.status(), GoalStatus::Active);
        assert!(goal.completed_at().is_none());

        assert!(goal.record_progress(200).completed_now);
        assert_eq!(goal.status(), GoalStatus::Completed);
    }

    #[test]
    fn completion_is_reported_once() {
        let mut goal = goal_with_tasks(2);

        let first = goal.record_progress(2);
        let second = goal.record_progress(2);

        assert!(first.completed_now);
        assert!(first.changed());
        assert!(!second.completed_now);
        assert!(!second.changed());
        assert_eq!(goal.status(), GoalStatus::Completed);
        assert!(goal.completed_at().is_some());
    }

    #[test]
    fn goal_without_tasks_stays_at_zero() {
        let mut goal = Goal::new(GoalDefinition::new("empty"));
        let update = goal.record_progress(0);

        assert_eq!(update.current, 0);
        assert!(!update.completed_now);
    }
}
