use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Known message types exchanged with the peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    // Outbound notifications
    AgentRegister,
    AgentUnregister,
    AgentStatusUpdate,
    TaskCreate,
    TaskStatusUpdate,
    GoalCreate,
    GoalDecompose,
    // Inbound notifications
    AgentRegistered,
    AgentUnregistered,
    TaskCompleted,
    TaskFailed,
    GoalCompleted,
    PerformanceUpdated,
    HealthCheckFailed,
    // Keep-alive
    Ping,
    Pong,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::AgentRegister => "agent:register",
            MessageKind::AgentUnregister => "agent:unregister",
            MessageKind::AgentStatusUpdate => "agent:status-update",
            MessageKind::TaskCreate => "task:create",
            MessageKind::TaskStatusUpdate => "task:status-update",
            MessageKind::GoalCreate => "goal:create",
            MessageKind::GoalDecompose => "goal:decompose",
            MessageKind::AgentRegistered => "agent:registered",
            MessageKind::AgentUnregistered => "agent:unregistered",
            MessageKind::TaskCompleted => "task:completed",
            MessageKind::TaskFailed => "task:failed",
            MessageKind::GoalCompleted => "goal:completed",
            MessageKind::PerformanceUpdated => "system:performance-updated",
            MessageKind::HealthCheckFailed => "agent:health-check-failed",
            MessageKind::Ping => "ping",
            MessageKind::Pong => "pong",
        }
    }

    /// Keep-alive traffic is handled by the transport and never dispatched
    pub fn is_keep_alive(&self) -> bool {
        matches!(self, MessageKind::Ping | MessageKind::Pong)
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "agent:register" => MessageKind::AgentRegister,
            "agent:unregister" => MessageKind::AgentUnregister,
            "agent:status-update" => MessageKind::AgentStatusUpdate,
            "task:create" => MessageKind::TaskCreate,
            "task:status-update" => MessageKind::TaskStatusUpdate,
            "goal:create" => MessageKind::GoalCreate,
            "goal:decompose" => MessageKind::GoalDecompose,
            "agent:registered" => MessageKind::AgentRegistered,
            "agent:unregistered" => MessageKind::AgentUnregistered,
            "task:completed" => MessageKind::TaskCompleted,
            "task:failed" => MessageKind::TaskFailed,
            "goal:completed" => MessageKind::GoalCompleted,
            "system:performance-updated" => MessageKind::PerformanceUpdated,
            "agent:health-check-failed" => MessageKind::HealthCheckFailed,
            "ping" => MessageKind::Ping,
            "pong" => MessageKind::Pong,
            other => return Err(format!("Unknown message type: {}", other)),
        };
        Ok(kind)
    }
}

/// Wire envelope for every message on the channel
///
/// ```json
/// { "type": "task:create", "payload": {}, "timestamp": 1700000000000, "taskId": "..." }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

impl Envelope {
    pub fn new(kind: MessageKind, payload: serde_json::Value) -> Self {
        Self {
            kind: kind.as_str().to_string(),
            payload,
            timestamp: now_millis(),
            agent_id: None,
            task_id: None,
        }
    }

    pub fn ping() -> Self {
        Self::new(MessageKind::Ping, serde_json::Value::Null)
    }

    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn with_task(mut self, task_id: impl ToString) -> Self {
        self.task_id = Some(task_id.to_string());
        self
    }

    /// Parsed message type; `None` for types outside the known vocabulary
    pub fn message_kind(&self) -> Option<MessageKind> {
        self.kind.parse().ok()
    }

    pub(crate) fn stamp(&mut self) {
        self.timestamp = now_millis();
    }
}

pub(crate) fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
