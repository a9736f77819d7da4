//! Credential Repository Implementation
//!
//! Read-mostly access to the credentials table. Rows are written by the
//! auth service; `insert` exists for seeding.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{Credential, CredentialRepository};
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct CredentialRow {
    id: i64,
    user_id: i64,
    username: String,
    email: String,
    is_active: bool,
    is_verified: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    is_deleted: bool,
}

impl CredentialRow {
    fn into_credential(self) -> Credential {
        Credential {
            id: self.id,
            user_id: self.user_id,
            username: self.username,
            email: self.email,
            is_active: self.is_active,
            is_verified: self.is_verified,
            created_at: self.created_at,
            updated_at: self.updated_at,
            is_deleted: self.is_deleted,
        }
    }
}

/// PostgreSQL credential repository implementation.
#[derive(Clone)]
pub struct PgCredentialRepository {
    pool: PgPool,
}

impl PgCredentialRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialRepository for PgCredentialRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Credential>, AppError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r#"
            SELECT id, user_id, username, email, is_active, is_verified,
                   created_at, updated_at, is_deleted
            FROM credentials
            WHERE id = $1 AND NOT is_deleted
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_credential()))
    }

    async fn find_by_user_id(&self, user_id: i64) -> Result<Option<Credential>, AppError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r#"
            SELECT id, user_id, username, email, is_active, is_verified,
                   created_at, updated_at, is_deleted
            FROM credentials
            WHERE user_id = $1 AND NOT is_deleted
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_credential()))
    }

    async fn insert(&self, credential: &Credential) -> Result<Credential, AppError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r#"
            INSERT INTO credentials (id, user_id, username, email, is_active, is_verified,
                                     created_at, updated_at, is_deleted)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, user_id, username, email, is_active, is_verified,
                      created_at, updated_at, is_deleted
            "#,
        )
        .bind(credential.id)
        .bind(credential.user_id)
        .bind(&credential.username)
        .bind(&credential.email)
        .bind(credential.is_active)
        .bind(credential.is_verified)
        .bind(credential.created_at)
        .bind(credential.updated_at)
        .bind(credential.is_deleted)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_credential())
    }
}
