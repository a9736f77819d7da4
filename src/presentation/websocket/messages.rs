//! Gateway frame types.
//!
//! Every text frame is a JSON object naming an event. Inbound frames may
//! carry an `ack` token; the command result is then delivered as an `ack`
//! frame echoing it, otherwise as a `system` frame.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::application::dto::CommandResponse;

/// Outbound event names
pub mod events {
    pub const AUTH_SUCCESS: &str = "auth_success";
    pub const ACK: &str = "ack";
    pub const SYSTEM: &str = "system";
    pub const MESSAGE: &str = "message";
    pub const MESSAGE_UPDATE: &str = "message_update";
    pub const MESSAGE_DELETE: &str = "message_delete";
    pub const UPDATE_NOTIFICATION: &str = "update_notification";
}

/// Inbound event carrying a handshake token instead of a header
pub const AUTHENTICATE: &str = "authenticate";

/// Frame received from a client
#[derive(Debug, Clone, Deserialize)]
pub struct InboundFrame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub ack: Option<Value>,
}

impl InboundFrame {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Payload of an `authenticate` frame
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthPayload {
    #[serde(default)]
    pub token: Option<String>,
}

/// Frame sent to a client
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OutboundFrame {
    pub event: String,
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ack: Option<Value>,
}

impl OutboundFrame {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
            ack: None,
        }
    }

    /// Wrap an envelope under `event`.
    pub fn envelope(event: impl Into<String>, response: &CommandResponse) -> Self {
        Self::new(event, serde_json::to_value(response).unwrap_or(Value::Null))
    }

    /// Result of a command: an `ack` frame when the client asked for one,
    /// a `system` frame otherwise.
    pub fn command_result(ack: Option<Value>, response: &CommandResponse) -> Self {
        match ack {
            Some(token) => Self {
                ack: Some(token),
                ..Self::envelope(events::ACK, response)
            },
            None => Self::envelope(events::SYSTEM, response),
        }
    }

    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
