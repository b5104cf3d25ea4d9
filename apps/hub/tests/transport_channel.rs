//! Transport channel lifecycle tests
//!
//! These tests drive the channel against a scripted in-memory peer on a
//! paused clock:
//! - Reconnect budget and exhaustion
//! - Explicit connect/disconnect
//! - Heartbeat and keep-alive handling
//! - Inbound dispatch and malformed frames

mod common;

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use orchestration_hub::transport::{ConnectionStatus, Envelope, MessageKind, TransportChannel};
use serde_json::json;
use tokio::time::{sleep, timeout};

use common::{channel, test_config, wait_connected, ScriptedConnector};

#[tokio::test(start_paused = true)]
async fn test_reconnect_budget_is_exhausted_after_ten_attempts() {
    let (channel, connector) = channel(10);
    let mut state = channel.subscribe_state();

    channel.connect();
    state.wait_for(|s| s.exhausted).await.unwrap();

    // Long after the budget is spent nothing else is scheduled
    sleep(Duration::from_secs(31 * 3)).await;

    assert_eq!(connector.attempts(), 11);
    let snapshot = channel.state();
    assert_eq!(snapshot.status, ConnectionStatus::Disconnected);
    assert_eq!(snapshot.reconnect_attempts, 10);
    assert!(snapshot.exhausted);
    assert!(snapshot.last_error.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_connect_after_exhaustion_starts_over() {
    let (channel, connector) = channel(2);
    let mut state = channel.subscribe_state();
    channel.connect();
    state.wait_for(|s| s.exhausted).await.unwrap();
    assert_eq!(connector.attempts(), 3);

    let _peer = connector.accept_next();
    channel.connect();
    wait_connected(&channel).await;

    let snapshot = channel.state();
    assert_eq!(snapshot.reconnect_attempts, 0);
    assert!(!snapshot.exhausted);
    assert_eq!(connector.attempts(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_connect_is_idempotent_while_active() {
    let (channel, connector) = channel(10);
    let _peer = connector.accept_next();

    channel.connect();
    channel.connect();
    wait_connected(&channel).await;
    channel.connect();

    assert_eq!(connector.attempts(), 1);
}

#[tokio::test]
async fn test_send_while_disconnected_returns_false() {
    let (channel, _connector) = channel(10);

    let sent = channel.send_message(Envelope::new(MessageKind::TaskCreate, json!({})));

    assert!(!sent);
    assert_eq!(channel.state().status, ConnectionStatus::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_send_while_connected_reaches_peer() {
    let (channel, connector) = channel(10);
    let mut peer = connector.accept_next();
    channel.connect();
    wait_connected(&channel).await;

    let mut envelope = Envelope::new(MessageKind::TaskCreate, json!({ "title": "fetch" }));
    envelope.timestamp = 0;
    assert!(channel.send_message(envelope.with_task("t-1")));

    let received = peer.next_envelope().await;
    assert_eq!(received.kind, "task:create");
    assert_eq!(received.task_id.as_deref(), Some("t-1"));
    assert_eq!(received.payload["title"], "fetch");
    assert!(received.timestamp > 0);
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_cancels_pending_reconnect() {
    let (channel, connector) = channel(10);
    let mut state = channel.subscribe_state();
    channel.connect();
    state.wait_for(|s| s.reconnect_attempts == 1).await.unwrap();

    channel.disconnect();
    channel.disconnect();
    sleep(Duration::from_secs(60)).await;

    assert_eq!(connector.attempts(), 1);
    let snapshot = channel.state();
    assert_eq!(snapshot.status, ConnectionStatus::Disconnected);
    assert_eq!(snapshot.reconnect_attempts, 10);
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_closes_open_session() {
    let (channel, connector) = channel(10);
    let peer = connector.accept_next();
    channel.connect();
    wait_connected(&channel).await;

    channel.disconnect();
    sleep(Duration::from_secs(60)).await;

    assert_eq!(connector.attempts(), 1);
    assert!(!channel.send_message(Envelope::ping()));
    assert!(peer.inbound.is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_peer_close_schedules_reconnect() {
    let (channel, connector) = channel(10);
    let peer = connector.accept_next();
    let _second = connector.accept_next();
    channel.connect();
    wait_connected(&channel).await;

    drop(peer);
    sleep(Duration::from_secs(4)).await;

    assert_eq!(connector.attempts(), 2);
    assert!(channel.is_connected());
    assert_eq!(channel.state().reconnect_attempts, 0);
}

#[tokio::test(start_paused = true)]
async fn test_heartbeat_sends_ping() {
    let (channel, connector) = channel(10);
    let mut peer = connector.accept_next();
    channel.connect();
    wait_connected(&channel).await;

    let text = timeout(Duration::from_secs(31), peer.sent.recv())
        .await
        .expect("no heartbeat within interval")
        .unwrap();
    let envelope: Envelope = serde_json::from_str(&text).unwrap();

    assert_eq!(envelope.message_kind(), Some(MessageKind::Ping));
}

#[tokio::test(start_paused = true)]
async fn test_zero_heartbeat_still_pings() {
    let connector = Arc::new(ScriptedConnector::default());
    let mut peer = connector.accept_next();
    let config = orchestration_hub::config::TransportConfig {
        heartbeat_interval: Duration::ZERO,
        ..test_config(10)
    };
    let channel = TransportChannel::new(config, connector.clone());
    channel.connect();
    wait_connected(&channel).await;

    let text = timeout(Duration::from_secs(1), peer.sent.recv())
        .await
        .expect("no heartbeat")
        .unwrap();
    let envelope: Envelope = serde_json::from_str(&text).unwrap();

    assert_eq!(envelope.message_kind(), Some(MessageKind::Ping));
    assert!(channel.is_connected());
}

#[tokio::test(start_paused = true)]
async fn test_inbound_ping_is_answered_not_dispatched() {
    let (channel, connector) = channel(10);
    let mut peer = connector.accept_next();
    channel.connect();
    wait_connected(&channel).await;

    peer.push(r#"{"type":"ping","payload":null,"timestamp":1}"#);
    peer.push(r#"{"type":"pong","payload":null,"timestamp":2}"#);
    peer.push(r#"{"type":"agent:registered","agentId":"a-1"}"#);

    let reply = peer.next_envelope().await;
    assert_eq!(reply.message_kind(), Some(MessageKind::Pong));

    assert!(channel.dispatch_next().await);
    let history = channel.message_history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].kind, "agent:registered");
}

#[tokio::test(start_paused = true)]
async fn test_inbound_message_is_dispatched_to_handler() {
    let (channel, connector) = channel(10);
    let peer = connector.accept_next();
    let received = Rc::new(RefCell::new(Vec::new()));
    let sink = received.clone();
    let _subscription = channel.on_message(MessageKind::GoalCompleted, move |envelope| {
        sink.borrow_mut().push(envelope.payload.clone());
    });
    channel.connect();
    wait_connected(&channel).await;

    peer.push(r#"{"type":"goal:completed","payload":{"goalId":"g-1"},"timestamp":5}"#);
    assert!(channel.dispatch_next().await);

    assert_eq!(*received.borrow(), vec![json!({ "goalId": "g-1" })]);
    assert_eq!(channel.last_message().unwrap().kind, "goal:completed");
}

#[tokio::test(start_paused = true)]
async fn test_malformed_frame_keeps_session_open() {
    let (channel, connector) = channel(10);
    let peer = connector.accept_next();
    channel.connect();
    wait_connected(&channel).await;

    peer.push("{not json");
    peer.push(r#"{"type":"task:completed","taskId":"t-9"}"#);
    assert!(channel.dispatch_next().await);

    assert!(channel.is_connected());
    assert_eq!(connector.attempts(), 1);
    assert_eq!(channel.message_history().len(), 1);
    assert_eq!(channel.last_message().unwrap().task_id.as_deref(), Some("t-9"));
}
