//! User Repository Implementation
//!
//! PostgreSQL implementation of the UserRepository trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{User, UserRepository};
use crate::shared::error::AppError;

/// Database row representation of the users table.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    display_name: String,
    avatar_url: Option<String>,
    is_online: bool,
    last_seen: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    is_deleted: bool,
    deleted_at: Option<DateTime<Utc>>,
}

impl UserRow {
    fn into_user(self) -> User {
        User {
            id: self.id,
            display_name: self.display_name,
            avatar_url: self.avatar_url,
            is_online: self.is_online,
            last_seen: self.last_seen,
            created_at: self.created_at,
            updated_at: self.updated_at,
            is_deleted: self.is_deleted,
            deleted_at: self.deleted_at,
        }
    }
}

const USER_COLUMNS: &str = "id, display_name, avatar_url, is_online, last_seen, \
                            created_at, updated_at, is_deleted, deleted_at";

/// PostgreSQL user repository implementation.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_user()))
    }

    async fn insert(&self, user: &User) -> Result<User, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (id, display_name, avatar_url, is_online, last_seen,
                               created_at, updated_at, is_deleted, deleted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user.id)
        .bind(&user.display_name)
        .bind(&user.avatar_url)
        .bind(user.is_online)
        .bind(user.last_seen)
        .bind(user.created_at)
        .bind(user.updated_at)
        .bind(user.is_deleted)
        .bind(user.deleted_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_user())
    }

    async fn save(&self, user: &User) -> Result<User, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
            SET display_name = $2,
                avatar_url = $3,
                is_online = $4,
                last_seen = $5,
                updated_at = $6,
                is_deleted = $7,
                deleted_at = $8
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user.id)
        .bind(&user.display_name)
        .bind(&user.avatar_url)
        .bind(user.is_online)
        .bind(user.last_seen)
        .bind(user.updated_at)
        .bind(user.is_deleted)
        .bind(user.deleted_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

        Ok(row.into_user())
    }
}
