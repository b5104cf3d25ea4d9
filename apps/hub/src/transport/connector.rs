// Connection seam
//
// The supervisor only sees text frames. Adapters translate their
// protocol's control frames (ping/pong/close) into `recv_text` results.

use async_trait::async_trait;

use super::errors::TransportResult;

/// One open, bidirectional text connection
#[async_trait]
pub trait Connection: Send {
    async fn send_text(&mut self, text: String) -> TransportResult<()>;

    /// Next text frame; `None` once the peer has closed the connection
    async fn recv_text(&mut self) -> Option<TransportResult<String>>;

    async fn close(&mut self);
}

/// Opens connections to a peer endpoint
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> TransportResult<Box<dyn Connection>>;
}
