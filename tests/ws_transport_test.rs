// Integration tests for the WebSocket transport against a local server
//
// These run on real time and real sockets; each wait is bounded so a
// broken transport fails the test instead of hanging it.

mod common;

use agri_telemetry::client::TelemetryClient;
use agri_telemetry::config::TelemetryConfig;
use agri_telemetry::telemetry::ConnectionState;
use common::{handshake_frame, telemetry_frame, wait_for_snapshot, wait_for_status};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use std::future::Future;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

async fn within<F: Future>(fut: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), fut)
        .await
        .expect("timed out")
}

fn config_for(listener: &TcpListener, interval_ms: u64, max_attempts: u32) -> TelemetryConfig {
    let mut config = TelemetryConfig::default();
    config.stream.url = format!("ws://{}", listener.local_addr().unwrap());
    config.stream.farm_id = "farm-1".to_string();
    config.reconnect.interval_ms = interval_ms;
    config.reconnect.max_attempts = max_attempts;
    config
}

/// Accepts one WebSocket connection, returning it with the request path
async fn accept(listener: &TcpListener) -> (WebSocketStream<TcpStream>, String) {
    let (stream, _) = listener.accept().await.unwrap();
    let mut path = String::new();
    let socket = tokio_tungstenite::accept_hdr_async(
        stream,
        |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            path = req.uri().path().to_string();
            Ok(resp)
        },
    )
    .await
    .unwrap();
    (socket, path)
}

#[tokio::test]
async fn test_frames_reach_store_and_server_close_reconnects() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let client = TelemetryClient::new(&config_for(&listener, 50, 5));
    let view = client.store();
    let mut updates = view.subscribe();

    client.connect();
    let (mut server, path) = within(accept(&listener)).await;
    assert_eq!(path, "/ws/sensors/farm-1");
    within(wait_for_status(&mut updates, ConnectionState::Connected)).await;

    server
        .send(Message::Text(handshake_frame().to_string()))
        .await
        .unwrap();
    server.send(Message::Ping(vec![7])).await.unwrap();
    // Binary payloads are not part of the protocol and get rejected
    server
        .send(Message::Binary(b"\x00\x01".to_vec()))
        .await
        .unwrap();
    server
        .send(Message::Text(
            telemetry_frame(1, 28.5, json!([])).to_string(),
        ))
        .await
        .unwrap();
    within(wait_for_snapshot(&mut updates, |s| s.current_reading.is_some())).await;

    assert_eq!(view.current_reading().unwrap().temperature, 28.5);
    assert_eq!(view.history().len(), 1);
    let stats = client.stats();
    assert_eq!(stats.frames_received, 3);
    assert_eq!(stats.handshakes, 1);
    assert_eq!(stats.frames_rejected, 1);

    server.close(None).await.unwrap();
    within(wait_for_status(&mut updates, ConnectionState::Disconnected)).await;

    let (_second, _) = within(accept(&listener)).await;
    within(wait_for_status(&mut updates, ConnectionState::Connected)).await;

    let stats = client.stats();
    assert_eq!(stats.connections_opened, 2);
    assert_eq!(stats.reconnects_scheduled, 1);
    assert_eq!(view.history().len(), 1);
}

#[tokio::test]
async fn test_disconnect_sends_close_frame() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let client = TelemetryClient::new(&config_for(&listener, 50, 5));
    let mut updates = client.store().subscribe();

    client.connect();
    let (mut server, _) = within(accept(&listener)).await;
    within(wait_for_status(&mut updates, ConnectionState::Connected)).await;

    client.disconnect();

    let message = within(server.next()).await;
    assert!(matches!(message, Some(Ok(Message::Close(_)))));
    assert_eq!(client.connection_status(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_reset_connection_then_refused_retry_ends_in_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let client = TelemetryClient::new(&config_for(&listener, 20, 1));
    let mut updates = client.store().subscribe();

    client.connect();
    let (server, _) = within(accept(&listener)).await;
    within(wait_for_status(&mut updates, ConnectionState::Connected)).await;

    // Nothing listens any more, and the peer vanishes without a close frame
    drop(listener);
    drop(server);

    within(wait_for_status(&mut updates, ConnectionState::Error)).await;
    within(wait_for_status(&mut updates, ConnectionState::Disconnected)).await;
    within(wait_for_status(&mut updates, ConnectionState::Connecting)).await;
    within(wait_for_status(&mut updates, ConnectionState::Error)).await;
    within(wait_for_status(&mut updates, ConnectionState::Disconnected)).await;
    within(wait_for_status(&mut updates, ConnectionState::Error)).await;

    assert!(!client.is_active());
    let stats = client.stats();
    assert_eq!(stats.connections_opened, 1);
    assert_eq!(stats.reconnects_scheduled, 1);
}
