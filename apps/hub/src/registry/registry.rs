use std::collections::HashMap;

use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

use super::errors::{EntityKind, RegistryError, RegistryResult};
use super::planner::{GoalPlanner, ObjectivePlanner};
use super::status::SystemStatus;
use crate::config::RegistryConfig;
use crate::domain::agent::{Agent, AgentRegistration, AgentStatus};
use crate::domain::events::OrchestrationEvent;
use crate::domain::goal::{Goal, GoalDefinition};
use crate::domain::metrics::SystemMetrics;
use crate::domain::task::{Task, TaskDefinition, TaskStatus, TaskStatusUpdate};

/// Authoritative in-memory store of agents, tasks and goals
///
/// All mutation logic lives here. Every successful mutation publishes
/// one or more [`OrchestrationEvent`]s on the registry's event bus; a
/// failed mutation leaves the store untouched and publishes nothing.
///
/// # Example
/// ```
/// use orchestration_hub::config::RegistryConfig;
/// use orchestration_hub::domain::agent::AgentRegistration;
/// use orchestration_hub::domain::task::TaskDefinition;
/// use orchestration_hub::registry::OrchestrationRegistry;
///
/// let mut registry = OrchestrationRegistry::new(RegistryConfig::default());
/// registry.register_agent(AgentRegistration::new("crawler", 3)).unwrap();
/// registry.create_task(TaskDefinition::new("fetch sitemap"));
///
/// assert_eq!(registry.queue_size(), 1);
/// ```
pub struct OrchestrationRegistry {
    config: RegistryConfig,
    agents: HashMap<String, Agent>,
    tasks: HashMap<Uuid, Task>,
    goals: HashMap<Uuid, Goal>,
    planner: Box<dyn GoalPlanner>,
    events: broadcast::Sender<OrchestrationEvent>,
}

impl OrchestrationRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self::with_planner(config, Box::new(ObjectivePlanner))
    }

    pub fn with_planner(config: RegistryConfig, planner: Box<dyn GoalPlanner>) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            config,
            agents: HashMap::new(),
            tasks: HashMap::new(),
            goals: HashMap::new(),
            planner,
            events,
        }
    }

    /// Subscribe to domain events published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<OrchestrationEvent> {
        self.events.subscribe()
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    fn emit(&self, event: OrchestrationEvent) {
        debug!(event = event.name(), "Publishing registry event");
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    // ===== Agents =====

    pub fn register_agent(&mut self, registration: AgentRegistration) -> RegistryResult<Agent> {
        let agent = Agent::from_registration(registration);
        if self.agents.contains_key(&agent.id) {
            return Err(RegistryError::AlreadyExists {
                kind: EntityKind::Agent,
                id: agent.id,
            });
        }

        info!(agent_id = %agent.id, name = %agent.name, "Agent registered");
        self.agents.insert(agent.id.clone(), agent.clone());
        self.emit(OrchestrationEvent::AgentRegistered {
            agent_id: agent.id.clone(),
        });
        Ok(agent)
    }

    pub fn unregister_agent(&mut self, agent_id: &str) -> RegistryResult<Agent> {
        let agent = self
            .agents
            .remove(agent_id)
            .ok_or_else(|| RegistryError::agent_not_found(agent_id))?;

        info!(agent_id = %agent.id, "Agent unregistered");
        self.emit(OrchestrationEvent::AgentUnregistered {
            agent_id: agent.id.clone(),
        });
        Ok(agent)
    }

    pub fn update_agent_status(
        &mut self,
        agent_id: &str,
        status: AgentStatus,
    ) -> RegistryResult<Agent> {
        let agent = self
            .agents
            .get_mut(agent_id)
            .ok_or_else(|| RegistryError::agent_not_found(agent_id))?;

        let previous = agent.set_status(status);
        let agent = agent.clone();

        debug!(agent_id = %agent.id, from = %previous, to = %status, "Agent status updated");
        self.emit(OrchestrationEvent::AgentStatusChanged {
            agent_id: agent.id.clone(),
            from: previous,
            to: status,
        });
        Ok(agent)
    }

    // ===== Tasks =====

    pub fn create_task(&mut self, definition: TaskDefinition) -> Task {
        self.insert_task(Task::new(definition))
    }

    fn insert_task(&mut self, task: Task) -> Task {
        debug!(task_id = %task.id(), title = task.title(), "Task created");
        self.tasks.insert(task.id(), task.clone());
        self.emit(OrchestrationEvent::TaskCreated {
            task_id: task.id(),
            goal_id: task.goal_id(),
        });
        task
    }

    /// Applies a status update to a task
    ///
    /// Binding an agent requires it to exist and to have fewer open
    /// (assigned or in-progress) tasks than its capacity. Reaching a
    /// terminal status recomputes the owning goal's progress.
    pub fn update_task_status(
        &mut self,
        task_id: Uuid,
        update: TaskStatusUpdate,
    ) -> RegistryResult<Task> {
        let current = self
            .tasks
            .get(&task_id)
            .ok_or_else(|| RegistryError::task_not_found(task_id))?;

        if !current.status().can_transition_to(update.status) {
            return Err(RegistryError::InvalidTransition {
                from: current.status(),
                to: update.status,
            });
        }

        if let Some(agent_id) = update.agent_id.as_deref() {
            if current.assigned_agent() != Some(agent_id) {
                self.check_agent_capacity(agent_id)?;
            }
        }

        let max_retries = self.config.max_task_retries;
        let task = self
            .tasks
            .get_mut(&task_id)
            .ok_or_else(|| RegistryError::task_not_found(task_id))?;
        let previous = task
            .apply(update, max_retries)
            .map_err(|err| RegistryError::from_transition(task_id, err))?;
        let task = task.clone();

        debug!(task_id = %task_id, from = %previous, to = %task.status(), "Task status updated");
        self.emit(OrchestrationEvent::TaskStatusChanged {
            task_id,
            from: previous,
            to: task.status(),
        });

        if task.status().is_terminal() {
            if let Some(goal_id) = task.goal_id() {
                self.refresh_goal_progress(goal_id);
            }
        }

        Ok(task)
    }

    fn check_agent_capacity(&self, agent_id: &str) -> RegistryResult<()> {
        let agent = self
            .agents
            .get(agent_id)
            .ok_or_else(|| RegistryError::agent_not_found(agent_id))?;

        if self.open_task_count(agent_id) >= agent.capacity as usize {
            return Err(RegistryError::AgentAtCapacity {
                agent_id: agent_id.to_string(),
                capacity: agent.capacity,
            });
        }
        Ok(())
    }

    /// Number of assigned or in-progress tasks bound to an agent
    pub fn open_task_count(&self, agent_id: &str) -> usize {
        self.tasks
            .values()
            .filter(|t| t.status().is_open() && t.assigned_agent() == Some(agent_id))
            .count()
    }

    // ===== Goals =====

    pub fn create_goal(&mut self, definition: GoalDefinition) -> Goal {
        let goal = Goal::new(definition);
        info!(goal_id = %goal.id(), name = goal.name(), "Goal created");
        self.goals.insert(goal.id(), goal.clone());
        self.emit(OrchestrationEvent::GoalCreated { goal_id: goal.id() });
        goal
    }

    /// Expands a goal into newly created pending tasks
    ///
    /// # Returns
    /// * `Ok(Vec<Uuid>)` - Ids of the new tasks, in plan order
    /// * `Err(RegistryError::GoalAlreadyDecomposed)` - The goal already has tasks
    pub fn decompose_goal(&mut self, goal_id: Uuid) -> RegistryResult<Vec<Uuid>> {
        let goal = self
            .goals
            .get(&goal_id)
            .ok_or_else(|| RegistryError::goal_not_found(goal_id))?;

        if goal.is_decomposed() {
            return Err(RegistryError::GoalAlreadyDecomposed(goal_id));
        }

        let plan = self.planner.plan(goal);
        let task_ids: Vec<Uuid> = plan
            .into_iter()
            .map(|definition| self.insert_task(Task::for_goal(definition, goal_id)).id())
            .collect();

        if let Some(goal) = self.goals.get_mut(&goal_id) {
            goal.attach_tasks(&task_ids);
        }

        info!(goal_id = %goal_id, tasks = task_ids.len(), "Goal decomposed");
        self.emit(OrchestrationEvent::GoalDecomposed {
            goal_id,
            task_ids: task_ids.clone(),
        });
        Ok(task_ids)
    }

    fn refresh_goal_progress(&mut self, goal_id: Uuid) {
        let Some(goal) = self.goals.get(&goal_id) else {
            return;
        };
        let completed = goal
            .task_ids()
            .iter()
            .filter_map(|id| self.tasks.get(id))
            .filter(|t| t.status() == TaskStatus::Completed)
            .count();

        let Some(goal) = self.goals.get_mut(&goal_id) else {
            return;
        };
        let update = goal.record_progress(completed);

        if update.changed() {
            self.emit(OrchestrationEvent::GoalProgressed {
                goal_id,
                progress: update.current,
            });
        }
        if update.completed_now {
            info!(goal_id = %goal_id, "Goal completed");
            self.emit(OrchestrationEvent::GoalCompleted { goal_id });
        }
    }

    // ===== Reads =====

    pub fn get_agent(&self, agent_id: &str) -> Option<&Agent> {
        self.agents.get(agent_id)
    }

    pub fn get_task(&self, task_id: Uuid) -> Option<&Task> {
        self.tasks.get(&task_id)
    }

    pub fn get_goal(&self, goal_id: Uuid) -> Option<&Goal> {
        self.goals.get(&goal_id)
    }

    /// Constituent tasks of a goal, in decomposition order
    pub fn tasks_for_goal(&self, goal_id: Uuid) -> Vec<&Task> {
        self.goals
            .get(&goal_id)
            .map(|goal| {
                goal.task_ids()
                    .iter()
                    .filter_map(|id| self.tasks.get(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Count of tasks currently pending
    pub fn queue_size(&self) -> usize {
        self.tasks
            .values()
            .filter(|t| t.status() == TaskStatus::Pending)
            .count()
    }

    pub fn metrics(&self) -> SystemMetrics {
        SystemMetrics::derive(self.agents.values(), self.tasks.values())
    }

    /// Snapshot of the whole store
    ///
    /// Agents are ordered by registration time, tasks and goals by
    /// creation time; ties break on id so the order is stable.
    pub fn get_system_status(&self) -> SystemStatus {
        let mut agents: Vec<Agent> = self.agents.values().cloned().collect();
        agents.sort_by(|a, b| {
            a.registered_at
                .cmp(&b.registered_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        let mut tasks: Vec<Task> = self.tasks.values().cloned().collect();
        tasks.sort_by_key(|t| (t.created_at(), t.id()));

        let mut goals: Vec<Goal> = self.goals.values().cloned().collect();
        goals.sort_by_key(|g| (g.created_at(), g.id()));

        SystemStatus {
            agents,
            tasks,
            goals,
            queue_size: self.queue_size(),
        }
    }
}

impl Default for OrchestrationRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}
