use serde::{Deserialize, Serialize};

use super::agent::{Agent, AgentStatus};
use super::task::{Task, TaskStatus};

/// System-wide statistics derived from registry contents
///
/// Never stored; recomputed from the current agents and tasks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemMetrics {
    pub total_agents: usize,
    pub active_agents: usize,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
    pub queue_size: usize,
    /// Mean recorded duration in milliseconds
    pub average_task_duration: f64,
    /// failed / total, 0 when there are no tasks
    pub system_error_rate: f64,
}

impl SystemMetrics {
    pub fn derive<'a, A, T>(agents: A, tasks: T) -> Self
    where
        A: IntoIterator<Item = &'a Agent>,
        T: IntoIterator<Item = &'a Task>,
    {
        let mut metrics = SystemMetrics::default();

        for agent in agents {
            metrics.total_agents += 1;
            if agent.status == AgentStatus::Active {
                metrics.active_agents += 1;
            }
        }

        let mut duration_sum: u64 = 0;
        let mut duration_count: u64 = 0;

        for task in tasks {
            metrics.total_tasks += 1;
            match task.status() {
                TaskStatus::Completed => metrics.completed_tasks += 1,
                TaskStatus::Failed => metrics.failed_tasks += 1,
                TaskStatus::Pending => metrics.queue_size += 1,
                _ => {}
            }
            if let Some(duration) = task.actual_duration_ms() {
                duration_sum += duration;
                duration_count += 1;
            }
        }

        metrics.average_task_duration = duration_sum as f64 / duration_count.max(1) as f64;
        metrics.system_error_rate = if metrics.total_tasks == 0 {
            0.0
        } else {
            metrics.failed_tasks as f64 / metrics.total_tasks as f64
        };

        metrics
    }
}
