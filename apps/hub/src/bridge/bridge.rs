use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde::Serialize;
use serde_json::json;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::notifications::{Notification, NotificationSink};
use super::state::ObservableState;
use crate::domain::agent::{Agent, AgentRegistration, AgentStatus};
use crate::domain::goal::{Goal, GoalDefinition};
use crate::domain::task::{Task, TaskDefinition, TaskStatusUpdate};
use crate::registry::{OrchestrationContext, OrchestrationRegistry, RegistryResult};
use crate::transport::{Envelope, MessageKind, Subscription, TransportChannel};

/// Remote events the bridge reconciles
const INBOUND: [MessageKind; 7] = [
    MessageKind::AgentRegistered,
    MessageKind::AgentUnregistered,
    MessageKind::TaskCompleted,
    MessageKind::TaskFailed,
    MessageKind::GoalCompleted,
    MessageKind::HealthCheckFailed,
    MessageKind::PerformanceUpdated,
];

struct BridgeInner {
    context: OrchestrationContext,
    channel: TransportChannel,
    state: watch::Sender<ObservableState>,
    notifier: Rc<dyn NotificationSink>,
    subscriptions: RefCell<Vec<Subscription>>,
}

/// Couples a transport channel to the registry
///
/// Local mutations commit to the registry first, then the snapshot is
/// re-derived, then the change is gossiped to the peer. Inbound events
/// only trigger the same re-derivation, so the snapshot always reflects
/// the registry however the last change arrived.
#[derive(Clone)]
pub struct SyncBridge {
    inner: Rc<BridgeInner>,
}

impl SyncBridge {
    pub fn new(
        context: OrchestrationContext,
        channel: TransportChannel,
        notifier: Rc<dyn NotificationSink>,
    ) -> Self {
        let (state, _) = watch::channel(ObservableState::default());
        let bridge = Self {
            inner: Rc::new(BridgeInner {
                context,
                channel,
                state,
                notifier,
                subscriptions: RefCell::new(Vec::new()),
            }),
        };
        bridge.rederive();
        bridge
    }

    fn from_weak(weak: &Weak<BridgeInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    pub fn context(&self) -> &OrchestrationContext {
        &self.inner.context
    }

    pub fn channel(&self) -> &TransportChannel {
        &self.inner.channel
    }

    pub fn state(&self) -> ObservableState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ObservableState> {
        self.inner.state.subscribe()
    }

    // ===== Lifecycle =====

    /// Registers the inbound handlers; idempotent
    pub fn start(&self) {
        let mut subscriptions = self.inner.subscriptions.borrow_mut();
        if !subscriptions.is_empty() {
            return;
        }

        for kind in INBOUND {
            let weak = Rc::downgrade(&self.inner);
            let subscription = self.inner.channel.on_message(kind, move |envelope| {
                let Some(bridge) = SyncBridge::from_weak(&weak) else {
                    return;
                };
                debug!(kind = %envelope.kind, "Reconciling remote event");
                bridge.rederive();
                if let Some(notice) = remote_notice(kind, envelope) {
                    bridge.notify(notice);
                }
            });
            subscriptions.push(subscription);
        }
    }

    /// Removes the inbound handlers registered by [`start`](Self::start)
    pub fn stop(&self) {
        for subscription in self.inner.subscriptions.borrow_mut().drain(..) {
            subscription.unsubscribe();
        }
    }

    /// Connects and drives inbound dispatch until the context shuts down
    ///
    /// Connection state changes are mirrored into the snapshot as they
    /// happen. The channel is disconnected on the way out.
    pub async fn run(&self) {
        self.start();
        self.inner.channel.connect();

        let shutdown = self.inner.context.shutdown_token();
        let mut connection = self.inner.channel.subscribe_state();
        self.rederive();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                changed = connection.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = connection.borrow_and_update().clone();
                    self.inner.state.send_modify(|s| s.connection = state);
                }
                open = self.inner.channel.dispatch_next() => {
                    if !open {
                        break;
                    }
                }
            }
        }

        self.stop();
        self.inner.channel.disconnect();
        self.rederive();
        info!("Synchronization bridge stopped");
    }

    // ===== Agents =====

    pub fn register_agent(&self, registration: AgentRegistration) -> RegistryResult<Agent> {
        let agent = self.perform("register agent", |r| r.register_agent(registration))?;

        self.publish(Envelope::new(MessageKind::AgentRegister, payload(&agent)).with_agent(&agent.id));
        self.notify(Notification::success(
            "Agent registered",
            format!("{} is ready for work", agent.name),
        ));
        Ok(agent)
    }

    pub fn unregister_agent(&self, agent_id: &str) -> RegistryResult<Agent> {
        let agent = self.perform("unregister agent", |r| r.unregister_agent(agent_id))?;

        self.publish(
            Envelope::new(MessageKind::AgentUnregister, json!({ "agentId": agent.id }))
                .with_agent(&agent.id),
        );
        self.notify(Notification::success(
            "Agent unregistered",
            format!("{} has been removed", agent.name),
        ));
        Ok(agent)
    }

    pub fn update_agent_status(&self, agent_id: &str, status: AgentStatus) -> RegistryResult<Agent> {
        let agent = self.perform("update agent status", |r| {
            r.update_agent_status(agent_id, status)
        })?;

        self.publish(
            Envelope::new(
                MessageKind::AgentStatusUpdate,
                json!({ "agentId": agent.id, "status": agent.status }),
            )
            .with_agent(&agent.id),
        );
        self.notify(Notification::success(
            "Agent status updated",
            format!("{} is now {}", agent.name, agent.status),
        ));
        Ok(agent)
    }

    // ===== Tasks =====

    pub fn create_task(&self, definition: TaskDefinition) -> RegistryResult<Task> {
        let task = self.perform("create task", |r| Ok(r.create_task(definition)))?;

        self.publish(Envelope::new(MessageKind::TaskCreate, payload(&task)).with_task(task.id()));
        self.notify(Notification::success(
            "Task created",
            format!("{} is queued", task.title()),
        ));
        Ok(task)
    }

    pub fn update_task_status(&self, task_id: Uuid, update: TaskStatusUpdate) -> RegistryResult<Task> {
        let task = self.perform("update task status", |r| {
            r.update_task_status(task_id, update)
        })?;

        let mut envelope =
            Envelope::new(MessageKind::TaskStatusUpdate, payload(&task)).with_task(task.id());
        if let Some(agent_id) = task.assigned_agent() {
            envelope = envelope.with_agent(agent_id);
        }
        self.publish(envelope);
        self.notify(Notification::success(
            "Task updated",
            format!("{} is now {}", task.title(), task.status()),
        ));
        Ok(task)
    }

    // ===== Goals =====

    pub fn create_goal(&self, definition: GoalDefinition) -> RegistryResult<Goal> {
        let goal = self.perform("create goal", |r| Ok(r.create_goal(definition)))?;

        self.publish(Envelope::new(MessageKind::GoalCreate, payload(&goal)));
        self.notify(Notification::success(
            "Goal created",
            format!("{} is active", goal.name()),
        ));
        Ok(goal)
    }

    pub fn decompose_goal(&self, goal_id: Uuid) -> RegistryResult<Vec<Uuid>> {
        let task_ids = self.perform("decompose goal", |r| r.decompose_goal(goal_id))?;

        self.publish(Envelope::new(
            MessageKind::GoalDecompose,
            json!({ "goalId": goal_id, "taskIds": task_ids }),
        ));
        self.notify(Notification::success(
            "Goal decomposed",
            format!("{} tasks created", task_ids.len()),
        ));
        Ok(task_ids)
    }

    // ===== Internals =====

    /// Runs one registry mutation and settles the snapshot
    ///
    /// On failure the previous snapshot is kept and only the loading
    /// flag and error message change.
    fn perform<T>(
        &self,
        action: &str,
        mutation: impl FnOnce(&mut OrchestrationRegistry) -> RegistryResult<T>,
    ) -> RegistryResult<T> {
        self.inner.state.send_modify(|s| s.is_loading = true);

        match self.inner.context.mutate(mutation) {
            Ok(value) => {
                self.rederive();
                self.inner.state.send_modify(|s| s.error = None);
                Ok(value)
            }
            Err(err) => {
                warn!(action, error = %err, "Operation failed");
                let message = err.to_string();
                self.inner.state.send_modify(|s| {
                    s.is_loading = false;
                    s.error = Some(message.clone());
                });
                self.notify(Notification::error(format!("Failed to {}", action), message));
                Err(err)
            }
        }
    }

    /// Recomputes the snapshot from the registry and channel
    fn rederive(&self) {
        let status = self.inner.context.read(|r| r.get_system_status());
        let metrics = status.metrics();
        let connection = self.inner.channel.state();

        self.inner.state.send_modify(|s| {
            s.agents = status.agents;
            s.tasks = status.tasks;
            s.goals = status.goals;
            s.metrics = metrics;
            s.queue_size = status.queue_size;
            s.connection = connection;
            s.is_loading = false;
        });
    }

    /// Best-effort gossip; the local mutation is already committed
    fn publish(&self, envelope: Envelope) {
        let kind = envelope.kind.clone();
        if !self.inner.channel.send_message(envelope) {
            debug!(%kind, "Peer notification not sent");
        }
    }

    fn notify(&self, notification: Notification) {
        self.inner.notifier.notify(notification);
    }
}

fn payload<T: Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_default()
}

fn payload_str<'a>(envelope: &'a Envelope, key: &str) -> Option<&'a str> {
    envelope.payload.get(key).and_then(|v| v.as_str())
}

/// Notice raised by a remote event, if any
fn remote_notice(kind: MessageKind, envelope: &Envelope) -> Option<Notification> {
    match kind {
        MessageKind::TaskFailed => Some(task_failed_notice(envelope)),
        MessageKind::GoalCompleted => Some(goal_completed_notice(envelope)),
        MessageKind::HealthCheckFailed => Some(health_check_notice(envelope)),
        _ => None,
    }
}

fn task_failed_notice(envelope: &Envelope) -> Notification {
    let task = envelope.task_id.as_deref().unwrap_or("unknown task");
    let description = match payload_str(envelope, "error") {
        Some(error) => format!("Task {} failed: {}", task, error),
        None => format!("Task {} failed", task),
    };
    Notification::error("Task failed", description)
}

fn goal_completed_notice(envelope: &Envelope) -> Notification {
    let goal = payload_str(envelope, "name")
        .or_else(|| payload_str(envelope, "goalId"))
        .unwrap_or("A goal");
    Notification::success("Goal completed", format!("{} has been completed", goal))
}

fn health_check_notice(envelope: &Envelope) -> Notification {
    let agent = envelope.agent_id.as_deref().unwrap_or("unknown agent");
    Notification::warning(
        "Agent health check failed",
        format!("Agent {} did not pass its health check", agent),
    )
}
