//! WebSocket Connection Handler
//!
//! One task per connection: handshake, then a read loop feeding the
//! command dispatcher while a writer task drains the connection's
//! outbound queue.

use std::time::Duration;

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::HeaderMap,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::time::timeout;
use uuid::Uuid;

use super::messages::{AuthPayload, InboundFrame, OutboundFrame, AUTHENTICATE};
use crate::startup::AppState;

/// How long a connection that already offered a query-string token waits
/// for an `authenticate` frame that would take precedence over it.
const QUERY_TOKEN_GRACE: Duration = Duration::from_millis(250);

/// Query parameters accepted on the upgrade request
#[derive(Debug, Default, Deserialize)]
pub struct GatewayQuery {
    pub token: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<GatewayQuery>,
) -> Response {
    let header_token = headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string());
    let max_message_size = state.settings.websocket.max_message_size;

    ws.max_message_size(max_message_size)
        .on_upgrade(move |socket| handle_socket(socket, state, header_token, query.token))
}

/// Outcome of waiting for the first client frame
enum FirstFrame {
    Token(Option<String>),
    Command(String),
    Silent,
    Closed,
}

/// Pick the handshake token: header first, then an `authenticate` frame,
/// then the query string.
fn resolve_token(
    header: Option<String>,
    frame: Option<String>,
    query: Option<String>,
) -> Option<String> {
    [header, frame, query]
        .into_iter()
        .flatten()
        .find(|token| !token.is_empty())
}

async fn handle_socket(
    socket: WebSocket,
    state: AppState,
    header_token: Option<String>,
    query_token: Option<String>,
) {
    let connection_id = Uuid::new_v4().to_string();
    let (mut sender, mut receiver) = socket.split();

    tracing::debug!(connection_id = %connection_id, "New WebSocket connection");

    let mut pending = None;
    let frame_token = if header_token.is_some() {
        None
    } else {
        let wait = if query_token.is_some() {
            QUERY_TOKEN_GRACE
        } else {
            Duration::from_secs(state.settings.websocket.handshake_timeout_secs)
        };
        match await_first_frame(&mut receiver, wait).await {
            FirstFrame::Token(token) => token,
            FirstFrame::Command(text) => {
                pending = Some(text);
                None
            }
            FirstFrame::Silent => None,
            FirstFrame::Closed => {
                tracing::debug!(connection_id = %connection_id, "Connection closed during handshake");
                return;
            }
        }
    };
    let token = resolve_token(header_token, frame_token, query_token);

    // Registered before authenticating so auth_success can be queued.
    let outbox = state.gateway.register(&connection_id);

    let session = match state
        .sessions
        .authenticate(&connection_id, token.as_deref())
        .await
    {
        Ok(session) => session,
        Err(_) => {
            state.gateway.unregister(&connection_id);
            refuse(&mut sender).await;
            return;
        }
    };

    let writer = tokio::spawn(write_frames(sender, outbox));

    if let Some(text) = pending {
        state.dispatcher.dispatch(&connection_id, &text).await;
    }

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                state.dispatcher.dispatch(&connection_id, text.as_str()).await;
            }
            Ok(Message::Close(_)) => {
                tracing::debug!(connection_id = %connection_id, "Connection closed");
                break;
            }
            Ok(Message::Binary(_)) => {
                tracing::debug!(connection_id = %connection_id, "Ignoring binary frame");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    state.sessions.teardown(&connection_id).await;
    state.gateway.unregister(&connection_id);
    if let Err(e) = writer.await {
        tracing::warn!(connection_id = %connection_id, error = %e, "Writer task ended abnormally");
    }

    tracing::info!(
        user_id = session.user_id,
        connection_id = %connection_id,
        "User disconnected"
    );
}

async fn await_first_frame(receiver: &mut SplitStream<WebSocket>, wait: Duration) -> FirstFrame {
    let first = timeout(wait, async {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => return Some(text.to_string()),
                Ok(Message::Close(_)) | Err(_) => return None,
                _ => continue,
            }
        }
        None
    })
    .await;

    match first {
        Err(_) => FirstFrame::Silent,
        Ok(None) => FirstFrame::Closed,
        Ok(Some(text)) => match InboundFrame::parse(&text) {
            Ok(frame) if frame.event == AUTHENTICATE => {
                let payload: AuthPayload = serde_json::from_value(frame.data).unwrap_or_default();
                FirstFrame::Token(payload.token)
            }
            _ => FirstFrame::Command(text),
        },
    }
}

/// Close a refused handshake with a policy-violation frame and no payload.
async fn refuse(sender: &mut SplitSink<WebSocket, Message>) {
    let close = Message::Close(Some(CloseFrame {
        code: close_code::POLICY,
        reason: "".into(),
    }));
    if let Err(e) = sender.send(close).await {
        tracing::debug!(error = %e, "Failed to send close frame");
    }
}

async fn write_frames(
    mut sender: SplitSink<WebSocket, Message>,
    mut outbox: tokio::sync::mpsc::Receiver<OutboundFrame>,
) {
    while let Some(frame) = outbox.recv().await {
        let text = match frame.to_text() {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(event = %frame.event, error = %e, "Failed to serialize frame");
                continue;
            }
        };
        if sender.send(Message::Text(text.into())).await.is_err() {
            break;
        }
    }
    let _ = sender.close().await;
}
