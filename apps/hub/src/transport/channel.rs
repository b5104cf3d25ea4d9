use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::connector::Connector;
use super::history::MessageHistory;
use super::message::{Envelope, MessageKind};
use super::state::{ConnectionState, ConnectionStatus};
use super::supervisor::Supervisor;
use crate::config::TransportConfig;

type Handler = Rc<dyn Fn(&Envelope)>;

/// Shortest heartbeat period the supervisor will tick at
pub const MIN_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Default)]
struct HandlerTable {
    handlers: HashMap<String, (u64, Handler)>,
    next_id: u64,
}

/// Registration returned by [`TransportChannel::on_message`]
///
/// Unsubscribing removes the handler only if it is still the one
/// registered for its type; a later registration is left in place.
pub struct Subscription {
    table: Weak<RefCell<HandlerTable>>,
    kind: String,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {
        let Some(table) = self.table.upgrade() else {
            return;
        };
        let mut table = table.borrow_mut();
        if table.handlers.get(&self.kind).map(|(id, _)| *id) == Some(self.id) {
            table.handlers.remove(&self.kind);
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }
}

struct SupervisorHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Resilient message channel to one peer endpoint
///
/// The connection itself is owned by a background supervisor task; this
/// handle queues outbound envelopes, exposes connection state, and
/// dispatches inbound envelopes to registered handlers on the caller's
/// thread through [`dispatch_next`](Self::dispatch_next).
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use orchestration_hub::config::TransportConfig;
/// use orchestration_hub::infrastructure::WebSocketConnector;
/// use orchestration_hub::transport::{Envelope, MessageKind, TransportChannel};
///
/// # async fn run() {
/// let channel = TransportChannel::new(
///     TransportConfig::for_host("localhost:3000"),
///     Arc::new(WebSocketConnector::default()),
/// );
/// let _sub = channel.on_message(MessageKind::GoalCompleted, |msg| {
///     println!("goal done: {:?}", msg.payload);
/// });
/// channel.connect();
/// channel.send_message(Envelope::new(MessageKind::TaskCreate, serde_json::json!({})));
///
/// // Inbound envelopes queue until dispatched
/// while channel.dispatch_next().await {}
/// # }
/// ```
pub struct TransportChannel {
    config: TransportConfig,
    connector: Arc<dyn Connector>,
    state: Arc<watch::Sender<ConnectionState>>,
    inbound_tx: mpsc::UnboundedSender<Envelope>,
    inbound_rx: Mutex<mpsc::UnboundedReceiver<Envelope>>,
    outbound: RefCell<Option<mpsc::UnboundedSender<Envelope>>>,
    supervisor: RefCell<Option<SupervisorHandle>>,
    handlers: Rc<RefCell<HandlerTable>>,
    history: RefCell<MessageHistory>,
}

impl TransportChannel {
    pub fn new(mut config: TransportConfig, connector: Arc<dyn Connector>) -> Self {
        if config.heartbeat_interval < MIN_HEARTBEAT_INTERVAL {
            warn!(
                "Heartbeat interval {:?} too short, using {:?}",
                config.heartbeat_interval, MIN_HEARTBEAT_INTERVAL
            );
            config.heartbeat_interval = MIN_HEARTBEAT_INTERVAL;
        }

        let (state, _) = watch::channel(ConnectionState::default());
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        Self {
            config,
            connector,
            state: Arc::new(state),
            inbound_tx,
            inbound_rx: Mutex::new(inbound_rx),
            outbound: RefCell::new(None),
            supervisor: RefCell::new(None),
            handlers: Rc::new(RefCell::new(HandlerTable::default())),
            history: RefCell::new(MessageHistory::default()),
        }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    fn supervisor_active(&self) -> bool {
        let supervisor = self.supervisor.borrow();
        match supervisor.as_ref() {
            Some(handle) => {
                !handle.cancel.is_cancelled()
                    && !handle.task.is_finished()
                    && !self.state.borrow().exhausted
            }
            None => false,
        }
    }

    /// Starts the connection lifecycle
    ///
    /// No-op while a supervisor is already connecting, connected or
    /// waiting to reconnect. After exhaustion or `disconnect()` this
    /// resets the attempt counter and starts over. Must be called from
    /// within a tokio runtime.
    pub fn connect(&self) {
        if self.supervisor_active() {
            debug!("Transport already active, ignoring connect");
            return;
        }

        if let Some(previous) = self.supervisor.borrow_mut().take() {
            previous.cancel.cancel();
        }

        let mut epoch = 0;
        self.state.send_modify(|s| {
            s.epoch += 1;
            s.status = ConnectionStatus::Connecting;
            s.reconnect_attempts = 0;
            s.exhausted = false;
            s.last_error = None;
            epoch = s.epoch;
        });

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let supervisor = Supervisor {
            config: self.config.clone(),
            connector: Arc::clone(&self.connector),
            state: Arc::clone(&self.state),
            outbound: outbound_rx,
            inbound: self.inbound_tx.clone(),
            cancel: cancel.clone(),
            epoch,
        };

        info!(url = %self.config.url, "Starting transport");
        let task = tokio::spawn(supervisor.run());
        *self.outbound.borrow_mut() = Some(outbound_tx);
        *self.supervisor.borrow_mut() = Some(SupervisorHandle { cancel, task });
    }

    /// Stops the connection lifecycle; idempotent
    ///
    /// Cancels the heartbeat and any pending reconnect, and pins the
    /// attempt counter at its maximum so nothing reconnects until the
    /// next explicit `connect()`.
    pub fn disconnect(&self) {
        if let Some(handle) = self.supervisor.borrow_mut().take() {
            info!(url = %self.config.url, "Disconnecting transport");
            handle.cancel.cancel();
        }
        self.outbound.borrow_mut().take();

        let max_attempts = self.config.max_reconnect_attempts;
        self.state.send_modify(|s| {
            s.epoch += 1;
            s.status = ConnectionStatus::Disconnected;
            s.reconnect_attempts = max_attempts;
        });
    }

    /// Queues an envelope for the peer
    ///
    /// Stamps the timestamp and returns `true` only when connected. No
    /// acknowledgment is awaited.
    pub fn send_message(&self, mut envelope: Envelope) -> bool {
        if !self.state.borrow().is_connected() {
            debug!(kind = %envelope.kind, "Transport not connected, dropping message");
            return false;
        }

        envelope.stamp();
        match self.outbound.borrow().as_ref() {
            Some(sender) => sender.send(envelope).is_ok(),
            None => false,
        }
    }

    /// Registers the handler for one message type
    ///
    /// A later registration for the same type replaces this one.
    pub fn on_message<F>(&self, kind: MessageKind, handler: F) -> Subscription
    where
        F: Fn(&Envelope) + 'static,
    {
        let mut table = self.handlers.borrow_mut();
        table.next_id += 1;
        let id = table.next_id;
        table
            .handlers
            .insert(kind.as_str().to_string(), (id, Rc::new(handler)));

        Subscription {
            table: Rc::downgrade(&self.handlers),
            kind: kind.as_str().to_string(),
            id,
        }
    }

    pub fn has_handler(&self, kind: MessageKind) -> bool {
        self.handlers.borrow().handlers.contains_key(kind.as_str())
    }

    /// Waits for the next inbound envelope and dispatches it
    ///
    /// Returns `false` only if the inbound queue has closed.
    pub async fn dispatch_next(&self) -> bool {
        let envelope = {
            let mut inbound = self.inbound_rx.lock().await;
            inbound.recv().await
        };

        match envelope {
            Some(envelope) => {
                self.dispatch(envelope);
                true
            }
            None => false,
        }
    }

    /// Records an inbound envelope and invokes its handler
    ///
    /// Types without a handler are recorded and otherwise ignored.
    pub fn dispatch(&self, envelope: Envelope) {
        self.history.borrow_mut().push(envelope.clone());

        let handler = self
            .handlers
            .borrow()
            .handlers
            .get(&envelope.kind)
            .map(|(_, handler)| Rc::clone(handler));

        match handler {
            Some(handler) => handler(&envelope),
            None => debug!(kind = %envelope.kind, "No handler registered, ignoring message"),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.state.borrow().is_connected()
    }

    pub fn last_message(&self) -> Option<Envelope> {
        self.history.borrow().last().cloned()
    }

    /// Received envelopes, oldest first
    pub fn message_history(&self) -> Vec<Envelope> {
        self.history.borrow().iter().cloned().collect()
    }
}

impl Drop for TransportChannel {
    fn drop(&mut self) {
        if let Some(handle) = self.supervisor.get_mut().take() {
            handle.cancel.cancel();
        }
    }
}
