use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Operational status reported for a registered agent
///
/// Agents may move between any two statuses; the registry does not
/// constrain agent status transitions the way it does for tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// Registered and waiting for work
    #[default]
    Idle,
    /// Online and accepting work
    Active,
    /// Online but saturated
    Busy,
    /// Not reachable
    Offline,
    /// Reported a fault
    Error,
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentStatus::Idle => write!(f, "idle"),
            AgentStatus::Active => write!(f, "active"),
            AgentStatus::Busy => write!(f, "busy"),
            AgentStatus::Offline => write!(f, "offline"),
            AgentStatus::Error => write!(f, "error"),
        }
    }
}

impl FromStr for AgentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(AgentStatus::Idle),
            "active" => Ok(AgentStatus::Active),
            "busy" => Ok(AgentStatus::Busy),
            "offline" => Ok(AgentStatus::Offline),
            "error" => Ok(AgentStatus::Error),
            other => Err(format!("Unknown agent status: {}", other)),
        }
    }
}
