//! Handshake over a real WebSocket connection

use axum_test::{TestWebSocket, WsMessage};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::{TestApp, DELIVERY_TIMEOUT};

/// Read text frames until one named `event` arrives.
async fn next_event(socket: &mut TestWebSocket, event: &str) -> Value {
    tokio::time::timeout(DELIVERY_TIMEOUT, async {
        loop {
            let frame: Value = serde_json::from_str(&socket.receive_text().await).unwrap();
            if frame["event"] == event {
                return frame;
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {}", event))
}

#[tokio::test]
async fn test_authenticate_frame_opens_session() {
    let app = TestApp::new();
    let user = app.seed_user().await;
    let server = app.socket_server();

    let mut socket = server.get_websocket("/gateway").await.into_websocket().await;
    socket
        .send_json(&json!({"event": "authenticate", "data": {"token": user.token}}))
        .await;

    let frame = next_event(&mut socket, "auth_success").await;
    assert_eq!(frame["data"]["success"], true);
    assert_eq!(app.state.sessions.session_count(), 1);
}

#[tokio::test]
async fn test_first_command_is_replayed_after_query_token() {
    let app = TestApp::new();
    let user = app.seed_user().await;
    let server = app.socket_server();

    let mut socket = server
        .get_websocket("/gateway")
        .add_query_param("token", &user.token)
        .await
        .into_websocket()
        .await;
    socket
        .send_json(&json!({"event": "list_categories", "ack": 7}))
        .await;

    next_event(&mut socket, "auth_success").await;
    let reply = next_event(&mut socket, "ack").await;
    assert_eq!(reply["ack"], 7);
    assert_eq!(reply["data"]["success"], true);
    assert_eq!(reply["data"]["data"], json!([]));
}

#[tokio::test]
async fn test_query_token_used_after_grace_period() {
    let app = TestApp::new();
    let user = app.seed_user().await;
    let server = app.socket_server();

    let mut socket = server
        .get_websocket("/gateway")
        .add_query_param("token", &user.token)
        .await
        .into_websocket()
        .await;

    // Nothing sent: the query token is used once the grace period lapses.
    let frame = next_event(&mut socket, "auth_success").await;
    assert_eq!(frame["data"]["success"], true);
}

#[tokio::test]
async fn test_authenticate_frame_beats_query_token() {
    let app = TestApp::new();
    let user = app.seed_user().await;
    let server = app.socket_server();

    let mut socket = server
        .get_websocket("/gateway")
        .add_query_param("token", "not-a-token")
        .await
        .into_websocket()
        .await;
    socket
        .send_json(&json!({"event": "authenticate", "data": {"token": user.token}}))
        .await;

    next_event(&mut socket, "auth_success").await;
}

#[tokio::test]
async fn test_rejected_handshake_closes_with_policy_violation() {
    let app = TestApp::new();
    let server = app.socket_server();

    let mut socket = server.get_websocket("/gateway").await.into_websocket().await;
    socket
        .send_json(&json!({"event": "authenticate", "data": {"token": "not-a-token"}}))
        .await;

    let message = tokio::time::timeout(DELIVERY_TIMEOUT, socket.receive_message())
        .await
        .expect("close frame");
    match message {
        WsMessage::Close(Some(frame)) => {
            assert_eq!(u16::from(frame.code), 1008);
            assert!(frame.reason.is_empty());
        }
        other => panic!("expected a close frame, got {:?}", other),
    }
    assert_eq!(app.state.sessions.session_count(), 0);
}
