use serde::Serialize;

/// Coarse connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// The last attempt or session ended in a failure; the channel is
    /// disconnected while in this status
    Error,
}

/// Observable state of a transport channel
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionState {
    pub status: ConnectionStatus,
    /// Reconnect attempts scheduled since the last successful open
    pub reconnect_attempts: u32,
    /// Set once the attempt budget is spent; only `connect()` clears it
    pub exhausted: bool,
    pub last_error: Option<String>,
    /// Bumped on every connect/disconnect so a stale supervisor cannot
    /// overwrite the state of its successor
    #[serde(skip)]
    pub(crate) epoch: u64,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    pub fn is_disconnected(&self) -> bool {
        matches!(
            self.status,
            ConnectionStatus::Disconnected | ConnectionStatus::Error
        )
    }
}
