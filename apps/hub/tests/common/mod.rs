//! Scripted in-memory peer for transport tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use orchestration_hub::config::TransportConfig;
use orchestration_hub::transport::{
    Connection, Connector, Envelope, TransportChannel, TransportError, TransportResult,
};
use tokio::sync::mpsc;

/// Connector that hands out queued connections and refuses once empty
#[derive(Default)]
pub struct ScriptedConnector {
    attempts: AtomicUsize,
    queue: Mutex<VecDeque<PeerConnection>>,
}

impl ScriptedConnector {
    /// Queues one connection and returns the peer side of it
    pub fn accept_next(&self) -> Peer {
        let (to_peer, sent) = mpsc::unbounded_channel();
        let (inbound, from_peer) = mpsc::unbounded_channel();
        self.queue.lock().unwrap().push_back(PeerConnection { to_peer, from_peer });
        Peer { sent, inbound }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, url: &str) -> TransportResult<Box<dyn Connection>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        match self.queue.lock().unwrap().pop_front() {
            Some(connection) => Ok(Box::new(connection)),
            None => Err(TransportError::Connection(format!("{} refused", url))),
        }
    }
}

pub struct PeerConnection {
    to_peer: mpsc::UnboundedSender<String>,
    from_peer: mpsc::UnboundedReceiver<String>,
}

#[async_trait]
impl Connection for PeerConnection {
    async fn send_text(&mut self, text: String) -> TransportResult<()> {
        self.to_peer
            .send(text)
            .map_err(|_| TransportError::Connection("peer gone".to_string()))
    }

    async fn recv_text(&mut self) -> Option<TransportResult<String>> {
        self.from_peer.recv().await.map(Ok)
    }

    async fn close(&mut self) {
        self.from_peer.close();
    }
}

/// Far end of a scripted connection
pub struct Peer {
    pub sent: mpsc::UnboundedReceiver<String>,
    pub inbound: mpsc::UnboundedSender<String>,
}

impl Peer {
    pub fn push(&self, raw: &str) {
        self.inbound.send(raw.to_string()).unwrap();
    }

    /// Next envelope the channel sent, skipping heartbeats
    pub async fn next_envelope(&mut self) -> Envelope {
        loop {
            let text = self.sent.recv().await.expect("channel closed");
            let envelope: Envelope = serde_json::from_str(&text).unwrap();
            if envelope.kind != "ping" {
                return envelope;
            }
        }
    }
}

pub fn test_config(max_reconnect_attempts: u32) -> TransportConfig {
    TransportConfig {
        url: "ws://peer.test/ws/orchestration".to_string(),
        heartbeat_interval: Duration::from_secs(30),
        reconnect_interval: Duration::from_secs(3),
        max_reconnect_attempts,
    }
}

pub fn channel(max_reconnect_attempts: u32) -> (TransportChannel, Arc<ScriptedConnector>) {
    let connector = Arc::new(ScriptedConnector::default());
    let channel = TransportChannel::new(test_config(max_reconnect_attempts), connector.clone());
    (channel, connector)
}

pub async fn wait_connected(channel: &TransportChannel) {
    let mut state = channel.subscribe_state();
    state.wait_for(|s| s.is_connected()).await.unwrap();
}
