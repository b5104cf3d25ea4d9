// Connection lifecycle task
//
// One supervisor owns the connection for as long as its token is live:
// connect, run the session (heartbeat, outbound queue, inbound frames),
// and on close wait `reconnect_interval` before the next attempt. It stops
// after `max_reconnect_attempts` consecutive failures or on cancellation.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::connector::{Connection, Connector};
use super::errors::{TransportError, TransportResult};
use super::message::{Envelope, MessageKind};
use super::state::{ConnectionState, ConnectionStatus};
use crate::config::TransportConfig;

enum SessionEnd {
    Cancelled,
    Closed,
    Failed(TransportError),
}

enum SessionEvent {
    Cancelled,
    Frame(Option<TransportResult<String>>),
    Outbound(Option<Envelope>),
    Heartbeat,
}

pub(crate) struct Supervisor {
    pub(crate) config: TransportConfig,
    pub(crate) connector: Arc<dyn Connector>,
    pub(crate) state: Arc<watch::Sender<ConnectionState>>,
    pub(crate) outbound: mpsc::UnboundedReceiver<Envelope>,
    pub(crate) inbound: mpsc::UnboundedSender<Envelope>,
    pub(crate) cancel: CancellationToken,
    pub(crate) epoch: u64,
}

impl Supervisor {
    /// Applies a state change unless a newer supervisor has taken over
    fn update(&self, f: impl FnOnce(&mut ConnectionState)) {
        let epoch = self.epoch;
        self.state.send_if_modified(|state| {
            if state.epoch != epoch {
                return false;
            }
            f(state);
            true
        });
    }

    fn attempts(&self) -> u32 {
        self.state.borrow().reconnect_attempts
    }

    pub(crate) async fn run(mut self) {
        let url = self.config.url.clone();
        let max_attempts = self.config.max_reconnect_attempts;

        loop {
            self.update(|s| s.status = ConnectionStatus::Connecting);

            let attempt = tokio::select! {
                _ = self.cancel.cancelled() => break,
                result = self.connector.connect(&url) => result,
            };

            match attempt {
                Ok(connection) => {
                    info!(url = %url, "Transport connected");
                    self.update(|s| {
                        s.status = ConnectionStatus::Connected;
                        s.reconnect_attempts = 0;
                        s.exhausted = false;
                        s.last_error = None;
                    });

                    match self.run_session(connection).await {
                        SessionEnd::Cancelled => break,
                        SessionEnd::Closed => {
                            info!(url = %url, "Transport closed by peer");
                            self.update(|s| s.status = ConnectionStatus::Disconnected);
                        }
                        SessionEnd::Failed(err) => {
                            warn!(url = %url, error = %err, "Transport session failed");
                            self.update(|s| {
                                s.status = ConnectionStatus::Error;
                                s.last_error = Some(err.to_string());
                            });
                        }
                    }
                }
                Err(err) => {
                    warn!(url = %url, error = %err, "Transport connection failed");
                    self.update(|s| {
                        s.status = ConnectionStatus::Error;
                        s.last_error = Some(err.to_string());
                    });
                }
            }

            if self.cancel.is_cancelled() {
                break;
            }

            let attempts = self.attempts();
            if attempts >= max_attempts {
                let err = TransportError::ReconnectExhausted { attempts };
                warn!(url = %url, error = %err, "Transport giving up");
                self.update(|s| {
                    s.status = ConnectionStatus::Disconnected;
                    s.exhausted = true;
                    s.last_error = Some(err.to_string());
                });
                return;
            }

            let next = attempts + 1;
            self.update(|s| s.reconnect_attempts = next);
            info!(
                "Reconnecting in {:?} (attempt {}/{})",
                self.config.reconnect_interval, next, max_attempts
            );

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = sleep(self.config.reconnect_interval) => {}
            }
        }

        debug!(url = %url, "Transport supervisor stopped");
        self.update(|s| s.status = ConnectionStatus::Disconnected);
    }

    async fn run_session(&mut self, mut connection: Box<dyn Connection>) -> SessionEnd {
        let mut heartbeat = interval(self.config.heartbeat_interval);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        heartbeat.tick().await;

        loop {
            let event = tokio::select! {
                _ = self.cancel.cancelled() => SessionEvent::Cancelled,
                frame = connection.recv_text() => SessionEvent::Frame(frame),
                envelope = self.outbound.recv() => SessionEvent::Outbound(envelope),
                _ = heartbeat.tick() => SessionEvent::Heartbeat,
            };

            let outcome = match event {
                SessionEvent::Cancelled | SessionEvent::Outbound(None) => {
                    connection.close().await;
                    return SessionEnd::Cancelled;
                }
                SessionEvent::Frame(None) => return SessionEnd::Closed,
                SessionEvent::Frame(Some(Err(err))) => return SessionEnd::Failed(err),
                SessionEvent::Frame(Some(Ok(text))) => {
                    handle_frame(connection.as_mut(), &self.inbound, &text).await
                }
                SessionEvent::Outbound(Some(envelope)) => {
                    send(connection.as_mut(), &envelope).await
                }
                SessionEvent::Heartbeat => {
                    debug!("Sending heartbeat");
                    send(connection.as_mut(), &Envelope::ping()).await
                }
            };

            if let Err(err) = outcome {
                return SessionEnd::Failed(err);
            }
        }
    }
}

/// Parses an inbound frame and forwards it for dispatch
///
/// Malformed frames are logged and dropped; they never end the session.
async fn handle_frame(
    connection: &mut dyn Connection,
    inbound: &mpsc::UnboundedSender<Envelope>,
    text: &str,
) -> TransportResult<()> {
    let envelope: Envelope = match serde_json::from_str(text) {
        Ok(envelope) => envelope,
        Err(err) => {
            let err = TransportError::from(err);
            warn!(error = %err, "Dropping inbound message");
            return Ok(());
        }
    };

    match envelope.message_kind() {
        Some(MessageKind::Ping) => {
            let pong = Envelope::new(MessageKind::Pong, serde_json::Value::Null);
            send(connection, &pong).await
        }
        Some(kind) if kind.is_keep_alive() => {
            debug!("Heartbeat acknowledged");
            Ok(())
        }
        _ => {
            // Receiver lives as long as the channel handle
            let _ = inbound.send(envelope);
            Ok(())
        }
    }
}

async fn send(connection: &mut dyn Connection, envelope: &Envelope) -> TransportResult<()> {
    let text = serde_json::to_string(envelope).map_err(TransportError::Encode)?;
    connection.send_text(text).await
}
