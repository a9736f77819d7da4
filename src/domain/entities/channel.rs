//! Channel entity and repository trait.
//!
//! Maps to the `channels` table. `category_id` is the backreference that
//! must always agree with the owning category's `channels_order`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{CompositeId, EntityKind};
use crate::shared::error::AppError;

/// Channel types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    /// A text channel
    #[default]
    Text,
    /// A voice channel
    Voice,
}

impl ChannelType {
    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "voice" => Self::Voice,
            _ => Self::Text,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Voice => "voice",
        }
    }
}

impl std::fmt::Display for ChannelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Channel {
    /// Snowflake ID (primary key)
    pub id: i64,

    /// Channel name (1-100 characters)
    pub name: String,

    pub description: String,

    #[serde(rename = "type")]
    pub channel_type: ChannelType,

    /// Owning category, if any
    pub category_id: Option<i64>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Channel {
    pub fn new(id: i64, name: impl Into<String>, description: impl Into<String>, channel_type: ChannelType) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            description: description.into(),
            channel_type,
            category_id: None,
            created_at: now,
            updated_at: now,
            is_deleted: false,
            deleted_at: None,
        }
    }

    pub fn composite_id(&self) -> CompositeId {
        CompositeId::new(EntityKind::Channel, self.id)
    }

    pub fn is_live(&self) -> bool {
        !self.is_deleted
    }

    /// Point the backreference at a category (or none) and bump `updated_at`.
    pub fn set_category(&mut self, category_id: Option<i64>) {
        self.category_id = category_id;
        self.updated_at = Utc::now();
    }
}

/// Repository trait for Channel data access operations.
#[async_trait]
pub trait ChannelRepository: Send + Sync {
    /// Find a channel by id, including soft-deleted records.
    async fn find_by_id(&self, id: i64) -> Result<Option<Channel>, AppError>;

    /// Insert a new channel.
    async fn insert(&self, channel: &Channel) -> Result<Channel, AppError>;

    /// Persist an existing channel (last writer wins).
    async fn save(&self, channel: &Channel) -> Result<Channel, AppError>;
}
