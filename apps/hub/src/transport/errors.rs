use thiserror::Error;

/// Transport-level failures
///
/// These never cross the public channel API: the supervisor logs them
/// and reflects them in [`ConnectionState`](super::ConnectionState).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Malformed message: {0}")]
    MessageParse(#[from] serde_json::Error),

    #[error("Failed to encode message: {0}")]
    Encode(serde_json::Error),

    #[error("Gave up after {attempts} reconnect attempts")]
    ReconnectExhausted { attempts: u32 },

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

pub type TransportResult<T> = Result<T, TransportError>;
