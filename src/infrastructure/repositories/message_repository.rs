//! Message Repository Implementation
//!
//! The recipient room is split into `room_type` and `room_id` columns so
//! timelines can use a plain composite index.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{Message, MessageRepository, MessageType, RoomKey};
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: i64,
    #[sqlx(rename = "type")]
    message_type: String,
    content: String,
    sent_by: i64,
    room_type: String,
    room_id: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    is_deleted: bool,
    deleted_at: Option<DateTime<Utc>>,
}

impl MessageRow {
    fn into_message(self) -> Result<Message, AppError> {
        let sent_to = RoomKey::from_parts(&self.room_type, &self.room_id.to_string())
            .map_err(|e| AppError::Store(format!("message {} has a bad room: {}", self.id, e)))?;
        Ok(Message {
            id: self.id,
            message_type: MessageType::from_str(&self.message_type),
            content: self.content,
            sent_by: self.sent_by,
            sent_to,
            created_at: self.created_at,
            updated_at: self.updated_at,
            is_deleted: self.is_deleted,
            deleted_at: self.deleted_at,
        })
    }
}

/// PostgreSQL message repository implementation.
#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Message>, AppError> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, type, content, sent_by, room_type, room_id,
                   created_at, updated_at, is_deleted, deleted_at
            FROM messages
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_message()).transpose()
    }

    async fn find_timeline(
        &self,
        room: &RoomKey,
        until: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Message>, AppError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, type, content, sent_by, room_type, room_id,
                   created_at, updated_at, is_deleted, deleted_at
            FROM messages
            WHERE room_type = $1 AND room_id = $2 AND created_at < $3 AND NOT is_deleted
            ORDER BY created_at DESC, id DESC
            LIMIT $4
            "#,
        )
        .bind(room.kind().as_str())
        .bind(room.id())
        .bind(until)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.into_message()).collect()
    }

    async fn insert(&self, message: &Message) -> Result<Message, AppError> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            INSERT INTO messages (id, type, content, sent_by, room_type, room_id,
                                  created_at, updated_at, is_deleted, deleted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, type, content, sent_by, room_type, room_id,
                      created_at, updated_at, is_deleted, deleted_at
            "#,
        )
        .bind(message.id)
        .bind(message.message_type.as_str())
        .bind(&message.content)
        .bind(message.sent_by)
        .bind(message.sent_to.kind().as_str())
        .bind(message.sent_to.id())
        .bind(message.created_at)
        .bind(message.updated_at)
        .bind(message.is_deleted)
        .bind(message.deleted_at)
        .fetch_one(&self.pool)
        .await?;

        row.into_message()
    }

    async fn save(&self, message: &Message) -> Result<Message, AppError> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            UPDATE messages
            SET type = $2,
                content = $3,
                updated_at = $4,
                is_deleted = $5,
                deleted_at = $6
            WHERE id = $1
            RETURNING id, type, content, sent_by, room_type, room_id,
                      created_at, updated_at, is_deleted, deleted_at
            "#,
        )
        .bind(message.id)
        .bind(message.message_type.as_str())
        .bind(&message.content)
        .bind(message.updated_at)
        .bind(message.is_deleted)
        .bind(message.deleted_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::not_found("Message"))?;

        row.into_message()
    }
}
