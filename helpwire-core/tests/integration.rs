//! Integration tests — connection lifecycle, message delivery, and
//! reconnection over a real TCP connection on localhost.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_util::codec::Framed;

use helpwire_core::catalog::{Heartbeat, LoginRequest, ServerNotice, TextMessage};
use helpwire_core::{
    ConnectionConfig, ConnectionEvent, ConnectionManager, FrameCodec, LinkState, MessageKind,
    Packet,
};

// ── Helpers ──────────────────────────────────────────────────────

/// Spin up a listener on an OS-assigned port and return it with a
/// matching client configuration (auto-reconnect off unless a test
/// turns it on).
async fn ephemeral_listener() -> (TcpListener, ConnectionConfig) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let config = ConnectionConfig {
        host: addr.ip().to_string(),
        port: addr.port(),
        auto_reconnect: false,
        reconnect_interval_ms: 50,
    };
    (listener, config)
}

async fn next_event(conn: &mut ConnectionManager) -> ConnectionEvent {
    tokio::time::timeout(Duration::from_secs(5), conn.next_event())
        .await
        .expect("timed out waiting for connection event")
}

// ── Connection lifecycle ─────────────────────────────────────────

#[tokio::test]
async fn connect_emits_connected_event() {
    let (listener, config) = ephemeral_listener().await;
    let mut conn = ConnectionManager::new(config);

    conn.connect().unwrap();
    let accept = tokio::spawn(async move { listener.accept().await.unwrap() });

    assert_eq!(next_event(&mut conn).await, ConnectionEvent::Connected);
    assert_eq!(conn.state(), LinkState::Connected);
    accept.await.unwrap();
}

#[tokio::test]
async fn dial_failure_reports_connection_error() {
    let (listener, config) = ephemeral_listener().await;
    // Free the port so the dial is refused.
    drop(listener);

    let mut conn = ConnectionManager::new(config);
    conn.connect().unwrap();

    let event = next_event(&mut conn).await;
    assert!(matches!(event, ConnectionEvent::ConnectionError(_)));
    assert_eq!(conn.state(), LinkState::Error);
    assert!(conn.last_error().is_some());
}

#[tokio::test]
async fn explicit_disconnect_is_not_retried() {
    let (listener, mut config) = ephemeral_listener().await;
    config.auto_reconnect = true;
    let mut conn = ConnectionManager::new(config);

    conn.connect().unwrap();
    let (_server, _) = listener.accept().await.unwrap();
    assert_eq!(next_event(&mut conn).await, ConnectionEvent::Connected);

    conn.disconnect();
    assert_eq!(next_event(&mut conn).await, ConnectionEvent::Disconnected);
    assert_eq!(conn.state(), LinkState::Disconnected);

    // No reconnect attempt follows an explicit disconnect.
    let silence =
        tokio::time::timeout(Duration::from_millis(300), conn.next_event()).await;
    assert!(silence.is_err());
    assert_eq!(conn.reconnect_attempts(), 0);
}

// ── Message delivery ─────────────────────────────────────────────

#[tokio::test]
async fn server_message_is_validated_and_delivered() {
    let (listener, config) = ephemeral_listener().await;
    let mut conn = ConnectionManager::new(config);
    conn.connect().unwrap();

    let (server, _) = listener.accept().await.unwrap();
    let mut framed = Framed::new(server, FrameCodec);
    assert_eq!(next_event(&mut conn).await, ConnectionEvent::Connected);

    let notice = ServerNotice::new("login-ok").with_detail("session s1");
    framed.send(notice.into_packet().unwrap()).await.unwrap();

    match next_event(&mut conn).await {
        ConnectionEvent::Message { kind, json, bin } => {
            assert_eq!(kind, MessageKind::ServerEvent);
            assert!(bin.is_empty());
            let parsed = ServerNotice::from_json(&json).unwrap();
            assert_eq!(parsed.event, "login-ok");
            assert_eq!(parsed.detail.as_deref(), Some("session s1"));
        }
        other => panic!("expected message event, got {other:?}"),
    }
}

#[tokio::test]
async fn invalid_packet_is_dropped_not_delivered() {
    let (listener, config) = ephemeral_listener().await;
    let mut conn = ConnectionManager::new(config);
    conn.connect().unwrap();

    let (server, _) = listener.accept().await.unwrap();
    let mut framed = Framed::new(server, FrameCodec);
    assert_eq!(next_event(&mut conn).await, ConnectionEvent::Connected);

    // A login with no password fails validation and must be dropped.
    let mut bad = LoginRequest::new("alice", "pw").to_json();
    bad.remove("password");
    let bad_packet = Packet::new(MessageKind::Login.code(), bad, Vec::new()).unwrap();
    framed.send(bad_packet).await.unwrap();

    // A valid heartbeat right behind it must still come through.
    framed
        .send(Heartbeat::new().into_packet().unwrap())
        .await
        .unwrap();

    match next_event(&mut conn).await {
        ConnectionEvent::Message { kind, .. } => assert_eq!(kind, MessageKind::Heartbeat),
        other => panic!("expected heartbeat, got {other:?}"),
    }
}

#[tokio::test]
async fn client_send_reaches_server() {
    let (listener, config) = ephemeral_listener().await;
    let mut conn = ConnectionManager::new(config);
    conn.connect().unwrap();

    let (server, _) = listener.accept().await.unwrap();
    let mut framed = Framed::new(server, FrameCodec);
    assert_eq!(next_event(&mut conn).await, ConnectionEvent::Connected);

    let text = TextMessage::new("lobby", "hello from the client");
    assert!(conn.send(MessageKind::Text, text.to_json(), &[]));

    let received = tokio::time::timeout(Duration::from_secs(5), framed.next())
        .await
        .expect("timed out")
        .expect("stream ended")
        .expect("decode failed");
    assert_eq!(received.kind(), MessageKind::Text.code());
    let parsed = TextMessage::from_json(received.json()).unwrap();
    assert_eq!(parsed.content, "hello from the client");
}

#[tokio::test]
async fn binary_payload_survives_the_wire() {
    let (listener, config) = ephemeral_listener().await;
    let mut conn = ConnectionManager::new(config);
    conn.connect().unwrap();

    let (server, _) = listener.accept().await.unwrap();
    let mut framed = Framed::new(server, FrameCodec);
    assert_eq!(next_event(&mut conn).await, ConnectionEvent::Connected);

    let samples = vec![0x5Au8; 480];
    let packet = helpwire_core::catalog::AudioFrame::new(48_000, 2)
        .into_packet(samples.clone())
        .unwrap();
    framed.send(packet).await.unwrap();

    match next_event(&mut conn).await {
        ConnectionEvent::Message { kind, bin, .. } => {
            assert_eq!(kind, MessageKind::AudioFrame);
            assert_eq!(bin, samples);
        }
        other => panic!("expected audio frame, got {other:?}"),
    }
}

// ── Reconnection ─────────────────────────────────────────────────

#[tokio::test]
async fn reconnects_after_server_drop() {
    let (listener, mut config) = ephemeral_listener().await;
    config.auto_reconnect = true;
    config.reconnect_interval_ms = 50;
    let mut conn = ConnectionManager::new(config);
    conn.connect().unwrap();

    let (server, _) = listener.accept().await.unwrap();
    assert_eq!(next_event(&mut conn).await, ConnectionEvent::Connected);

    // Server drops the connection.
    drop(server);
    assert_eq!(next_event(&mut conn).await, ConnectionEvent::Disconnected);
    match next_event(&mut conn).await {
        ConnectionEvent::Reconnecting { attempt, .. } => assert_eq!(attempt, 1),
        other => panic!("expected reconnecting, got {other:?}"),
    }

    // The client dials again after the interval. The accept must run
    // concurrently: the redial is driven from the event pump.
    let accept = tokio::spawn(async move { listener.accept().await.unwrap() });
    assert_eq!(next_event(&mut conn).await, ConnectionEvent::Connected);
    assert_eq!(conn.reconnect_attempts(), 0, "counter resets on success");
    accept.await.unwrap();
}

// ── Send while down ──────────────────────────────────────────────

#[tokio::test]
async fn send_on_disconnected_manager_fails_without_side_effects() {
    let (_listener, config) = ephemeral_listener().await;
    let mut conn = ConnectionManager::new(config);

    let sent = conn.send(MessageKind::Heartbeat, Heartbeat::new().to_json(), &[]);
    assert!(!sent);
    assert_eq!(conn.state(), LinkState::Disconnected);
    assert!(conn.last_error().is_some());
}
