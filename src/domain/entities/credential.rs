//! Credential entity and repository trait.
//!
//! A credential binds a login identity to a user id. Secrets never reach
//! this crate; only the linkage and the activation flag are consulted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    /// Snowflake ID (primary key)
    pub id: i64,

    /// Owning user
    pub user_id: i64,

    /// Login name
    pub username: String,

    pub email: String,

    /// Administratively deactivated credentials cannot open connections
    pub is_active: bool,

    /// Email verified
    pub is_verified: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_deleted: bool,
}

impl Credential {
    pub fn new(id: i64, user_id: i64, username: impl Into<String>, email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            username: username.into(),
            email: email.into(),
            is_active: true,
            is_verified: false,
            created_at: now,
            updated_at: now,
            is_deleted: false,
        }
    }
}

/// Repository trait for Credential lookups.
#[async_trait]
pub trait CredentialRepository: Send + Sync {
    /// Find a non-deleted credential by id.
    async fn find_by_id(&self, id: i64) -> Result<Option<Credential>, AppError>;

    /// Find the non-deleted credential owned by a user.
    async fn find_by_user_id(&self, user_id: i64) -> Result<Option<Credential>, AppError>;

    /// Insert a new credential.
    async fn insert(&self, credential: &Credential) -> Result<Credential, AppError>;
}
