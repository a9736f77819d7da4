//! Channel Repository Implementation
//!
//! PostgreSQL implementation of the ChannelRepository trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};

use crate::domain::{Channel, ChannelRepository, ChannelType};
use crate::shared::error::AppError;

/// Database row representation of the channels table.
#[derive(Debug, sqlx::FromRow)]
struct ChannelRow {
    id: i64,
    name: String,
    description: String,
    #[sqlx(rename = "type")]
    channel_type: String,
    category_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    is_deleted: bool,
    deleted_at: Option<DateTime<Utc>>,
}

impl ChannelRow {
    fn into_channel(self) -> Channel {
        Channel {
            id: self.id,
            name: self.name,
            description: self.description,
            channel_type: ChannelType::from_str(&self.channel_type),
            category_id: self.category_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
            is_deleted: self.is_deleted,
            deleted_at: self.deleted_at,
        }
    }
}

/// Insert or fully replace a channel row.
pub(crate) async fn upsert_channel<'e, E>(executor: E, channel: &Channel) -> Result<(), AppError>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO channels (id, name, description, type, category_id,
                              created_at, updated_at, is_deleted, deleted_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (id) DO UPDATE
        SET name = EXCLUDED.name,
            description = EXCLUDED.description,
            type = EXCLUDED.type,
            category_id = EXCLUDED.category_id,
            updated_at = EXCLUDED.updated_at,
            is_deleted = EXCLUDED.is_deleted,
            deleted_at = EXCLUDED.deleted_at
        "#,
    )
    .bind(channel.id)
    .bind(&channel.name)
    .bind(&channel.description)
    .bind(channel.channel_type.as_str())
    .bind(channel.category_id)
    .bind(channel.created_at)
    .bind(channel.updated_at)
    .bind(channel.is_deleted)
    .bind(channel.deleted_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// PostgreSQL channel repository implementation.
#[derive(Clone)]
pub struct PgChannelRepository {
    pool: PgPool,
}

impl PgChannelRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChannelRepository for PgChannelRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Channel>, AppError> {
        let row = sqlx::query_as::<_, ChannelRow>(
            r#"
            SELECT id, name, description, type, category_id,
                   created_at, updated_at, is_deleted, deleted_at
            FROM channels
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_channel()))
    }

    async fn insert(&self, channel: &Channel) -> Result<Channel, AppError> {
        let row = sqlx::query_as::<_, ChannelRow>(
            r#"
            INSERT INTO channels (id, name, description, type, category_id,
                                  created_at, updated_at, is_deleted, deleted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, name, description, type, category_id,
                      created_at, updated_at, is_deleted, deleted_at
            "#,
        )
        .bind(channel.id)
        .bind(&channel.name)
        .bind(&channel.description)
        .bind(channel.channel_type.as_str())
        .bind(channel.category_id)
        .bind(channel.created_at)
        .bind(channel.updated_at)
        .bind(channel.is_deleted)
        .bind(channel.deleted_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_channel())
    }

    async fn save(&self, channel: &Channel) -> Result<Channel, AppError> {
        upsert_channel(&self.pool, channel).await?;
        Ok(channel.clone())
    }
}
