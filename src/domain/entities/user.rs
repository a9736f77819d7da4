//! User (identity) entity and repository trait.
//!
//! Maps to the `users` table. Presence fields are the only ones this crate
//! writes; registration happens elsewhere.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{CompositeId, EntityKind};
use crate::shared::error::AppError;

/// Represents a user identity in the chat system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Snowflake ID (primary key)
    pub id: i64,

    /// Display name (1-100 characters)
    pub display_name: String,

    /// URL to user's avatar image
    pub avatar_url: Option<String>,

    /// Presence flag, flipped by the session manager
    pub is_online: bool,

    /// Last time the user was seen connecting
    pub last_seen: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Public profile sent to other connections
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublicUser {
    pub id: CompositeId,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub is_online: bool,
    pub last_seen: Option<DateTime<Utc>>,
}

impl User {
    /// Create a fresh, offline user.
    pub fn new(id: i64, display_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            display_name: display_name.into(),
            avatar_url: None,
            is_online: false,
            last_seen: None,
            created_at: now,
            updated_at: now,
            is_deleted: false,
            deleted_at: None,
        }
    }

    pub fn composite_id(&self) -> CompositeId {
        CompositeId::new(EntityKind::User, self.id)
    }

    /// Set presence. Going online also refreshes `last_seen`.
    pub fn set_online_status(&mut self, online: bool) {
        let now = Utc::now();
        self.is_online = online;
        if online {
            self.last_seen = Some(now);
        }
        self.updated_at = now;
    }

    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            id: self.composite_id(),
            display_name: self.display_name.clone(),
            avatar_url: self.avatar_url.clone(),
            is_online: self.is_online,
            last_seen: self.last_seen,
        }
    }
}

/// Repository trait for User data access operations.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by id, including soft-deleted records.
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError>;

    /// Insert a new user.
    async fn insert(&self, user: &User) -> Result<User, AppError>;

    /// Persist an existing user (last writer wins).
    async fn save(&self, user: &User) -> Result<User, AppError>;
}
