//! Message Service
//!
//! Sending, editing and soft-deleting messages, plus backwards timeline
//! paging. Messages are only ever addressed to live channel rooms.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::{Message, MessageType, RoomKey, RoomKind, Store};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;
use crate::shared::validation::FieldErrorTree;

/// Message service trait
#[async_trait]
pub trait MessageService: Send + Sync {
    /// Store a new message addressed to `room`
    async fn send_message(
        &self,
        sender_id: i64,
        room: RoomKey,
        message_type: MessageType,
        content: String,
    ) -> Result<Message, AppError>;

    /// Replace the content of a message sent by `actor_id`
    async fn edit_message(
        &self,
        message_id: i64,
        actor_id: i64,
        content: String,
    ) -> Result<Message, AppError>;

    /// Soft-delete a message sent by `actor_id`
    async fn delete_message(&self, message_id: i64, actor_id: i64) -> Result<Message, AppError>;

    /// Up to `amount` messages of `room` older than `until`, newest first
    async fn timeline(
        &self,
        room: RoomKey,
        until: DateTime<Utc>,
        amount: usize,
    ) -> Result<Vec<Message>, AppError>;
}

/// MessageService implementation
pub struct MessageServiceImpl {
    store: Store,
    ids: Arc<SnowflakeGenerator>,
}

impl MessageServiceImpl {
    pub fn new(store: Store, ids: Arc<SnowflakeGenerator>) -> Self {
        Self { store, ids }
    }

    async fn ensure_room_exists(&self, room: &RoomKey) -> Result<(), AppError> {
        match room.kind() {
            RoomKind::Channel => match self.store.channels.find_by_id(room.id()).await? {
                Some(channel) if channel.is_live() => Ok(()),
                _ => Err(AppError::not_found("Channel")),
            },
        }
    }

    async fn owned_live_message(&self, message_id: i64, actor_id: i64) -> Result<Message, AppError> {
        let message = match self.store.messages.find_by_id(message_id).await? {
            Some(message) if !message.is_deleted => message,
            _ => return Err(AppError::not_found("Message")),
        };
        if message.sent_by != actor_id {
            return Err(AppError::InvariantViolation(
                "Only the sender can change a message".into(),
            ));
        }
        Ok(message)
    }
}

#[async_trait]
impl MessageService for MessageServiceImpl {
    async fn send_message(
        &self,
        sender_id: i64,
        room: RoomKey,
        message_type: MessageType,
        content: String,
    ) -> Result<Message, AppError> {
        self.ensure_room_exists(&room).await?;

        let message = Message::new(self.ids.generate(), message_type, content, sender_id, room);
        self.store.messages.insert(&message).await
    }

    async fn edit_message(
        &self,
        message_id: i64,
        actor_id: i64,
        content: String,
    ) -> Result<Message, AppError> {
        let mut message = self.owned_live_message(message_id, actor_id).await?;
        message.edit(content);
        self.store.messages.save(&message).await
    }

    async fn delete_message(&self, message_id: i64, actor_id: i64) -> Result<Message, AppError> {
        let mut message = self.owned_live_message(message_id, actor_id).await?;
        message.soft_delete();
        self.store.messages.save(&message).await
    }

    async fn timeline(
        &self,
        room: RoomKey,
        until: DateTime<Utc>,
        amount: usize,
    ) -> Result<Vec<Message>, AppError> {
        self.ensure_room_exists(&room).await?;
        self.store.messages.find_timeline(&room, until, amount).await
    }
}

/// Parse a timeline cursor: an RFC 3339 timestamp or a bare date, which
/// means midnight UTC of that day.
pub fn parse_until(value: &str) -> Result<DateTime<Utc>, AppError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Some(midnight) = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc());
    }

    let mut errors = FieldErrorTree::default();
    errors.push(
        &["until"],
        "Expected an RFC 3339 timestamp or YYYY-MM-DD date",
        "datetime_parsing",
    );
    Err(AppError::Validation(errors))
}
