//! Domain events published after successful mutations.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::application::dto::MessageDto;
use crate::domain::{CompositeId, RoomKey};

/// Named channels handlers subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    MessageCreation,
    MessageUpdate,
    MessageDeletion,
    UpdateNotification,
}

impl Topic {
    pub const ALL: [Topic; 4] = [
        Topic::MessageCreation,
        Topic::MessageUpdate,
        Topic::MessageDeletion,
        Topic::UpdateNotification,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MessageCreation => "message_creation",
            Self::MessageUpdate => "message_update",
            Self::MessageDeletion => "message_deletion",
            Self::UpdateNotification => "update_notification",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Collections an update notification can refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Message,
    Channel,
    Category,
    User,
}

/// Lightweight "something changed" signal for clients to refetch on.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UpdateNotification {
    pub id: CompositeId,
    pub collection: Collection,
    pub additional_data: Value,
    pub timestamp: DateTime<Utc>,
}

impl UpdateNotification {
    pub fn new(id: CompositeId, collection: Collection) -> Self {
        Self {
            id,
            collection,
            additional_data: Value::Null,
            timestamp: Utc::now(),
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.additional_data = data;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    MessageCreated(MessageDto),
    MessageUpdated(MessageDto),
    MessageDeleted(MessageDto),
    Updated(UpdateNotification),
}

impl DomainEvent {
    pub fn topic(&self) -> Topic {
        match self {
            Self::MessageCreated(_) => Topic::MessageCreation,
            Self::MessageUpdated(_) => Topic::MessageUpdate,
            Self::MessageDeleted(_) => Topic::MessageDeletion,
            Self::Updated(_) => Topic::UpdateNotification,
        }
    }

    /// The room a message event is addressed to.
    pub fn room(&self) -> Option<RoomKey> {
        match self {
            Self::MessageCreated(m) | Self::MessageUpdated(m) | Self::MessageDeleted(m) => {
                Some(m.sent_to)
            }
            Self::Updated(_) => None,
        }
    }
}
