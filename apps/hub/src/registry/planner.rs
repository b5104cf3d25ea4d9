// Goal decomposition strategies
//
// A planner turns a goal into an ordered list of task definitions. The
// registry owns task creation; planners only describe the work.

use crate::domain::goal::Goal;
use crate::domain::task::TaskDefinition;

/// Expands a goal into task definitions
pub trait GoalPlanner {
    fn plan(&self, goal: &Goal) -> Vec<TaskDefinition>;
}

/// Default planner: one task per planned objective, in order
///
/// A goal without objectives becomes a single task named after the goal.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectivePlanner;

impl GoalPlanner for ObjectivePlanner {
    fn plan(&self, goal: &Goal) -> Vec<TaskDefinition> {
        if goal.objectives().is_empty() {
            return vec![TaskDefinition::new(goal.name())
                .with_description(goal.description())
                .with_priority(goal.priority())];
        }

        goal.objectives()
            .iter()
            .enumerate()
            .map(|(index, objective)| {
                TaskDefinition::new(objective.clone())
                    .with_description(format!(
                        "{} (step {} of {})",
                        goal.name(),
                        index + 1,
                        goal.objectives().len()
                    ))
                    .with_priority(goal.priority())
            })
            .collect()
    }
}
