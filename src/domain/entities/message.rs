//! Message entity and repository trait.
//!
//! Messages are addressed to a room and never move between rooms. Edits
//! and deletes mutate in place; deletes are soft.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{CompositeId, EntityKind, RoomKey};
use crate::shared::error::AppError;

/// Message payload kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    #[default]
    Text,
    Audio,
    Video,
    Image,
    File,
    Other,
}

impl MessageType {
    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "audio" => Self::Audio,
            "video" => Self::Video,
            "image" => Self::Image,
            "file" => Self::File,
            "other" => Self::Other,
            _ => Self::Text,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Image => "image",
            Self::File => "file",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Snowflake ID (primary key)
    pub id: i64,

    #[serde(rename = "type")]
    pub message_type: MessageType,

    pub content: String,

    /// Sending user id
    pub sent_by: i64,

    /// Recipient room
    pub sent_to: RoomKey,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Message {
    pub fn new(id: i64, message_type: MessageType, content: impl Into<String>, sent_by: i64, sent_to: RoomKey) -> Self {
        let now = Utc::now();
        Self {
            id,
            message_type,
            content: content.into(),
            sent_by,
            sent_to,
            created_at: now,
            updated_at: now,
            is_deleted: false,
            deleted_at: None,
        }
    }

    pub fn composite_id(&self) -> CompositeId {
        CompositeId::new(EntityKind::Message, self.id)
    }

    pub fn edit(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.updated_at = Utc::now();
    }

    pub fn soft_delete(&mut self) {
        let now = Utc::now();
        self.is_deleted = true;
        self.deleted_at = Some(now);
        self.updated_at = now;
    }
}

/// Repository trait for Message data access operations.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Find a message by id, including soft-deleted records.
    async fn find_by_id(&self, id: i64) -> Result<Option<Message>, AppError>;

    /// Non-deleted messages of a room created strictly before `until`,
    /// newest first, at most `limit`.
    async fn find_timeline(
        &self,
        room: &RoomKey,
        until: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Message>, AppError>;

    /// Insert a new message.
    async fn insert(&self, message: &Message) -> Result<Message, AppError>;

    /// Persist an existing message (last writer wins).
    async fn save(&self, message: &Message) -> Result<Message, AppError>;
}
