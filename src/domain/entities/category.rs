//! Category entity and repository trait.
//!
//! Categories form one global singly-linked chain through
//! `next_category_id`, and each holds the ordered list of its channels.
//! The head of the chain is implicit: the live category no other live
//! category points to.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{CompositeId, EntityKind};
use crate::shared::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    /// Snowflake ID (primary key)
    pub id: i64,

    pub name: String,

    pub description: Option<String>,

    /// Member channel ids, unique and order-significant
    pub channels_order: Vec<i64>,

    /// Next category in the chain
    pub next_category_id: Option<i64>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Category {
    pub fn new(id: i64, name: impl Into<String>, description: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            description,
            channels_order: Vec::new(),
            next_category_id: None,
            created_at: now,
            updated_at: now,
            is_deleted: false,
            deleted_at: None,
        }
    }

    pub fn composite_id(&self) -> CompositeId {
        CompositeId::new(EntityKind::Category, self.id)
    }

    pub fn contains_channel(&self, channel_id: i64) -> bool {
        self.channels_order.contains(&channel_id)
    }

    /// Remove every occurrence of a channel. Returns whether anything changed.
    pub fn remove_channel(&mut self, channel_id: i64) -> bool {
        let before = self.channels_order.len();
        self.channels_order.retain(|id| *id != channel_id);
        before != self.channels_order.len()
    }

    /// Append a channel, dropping any earlier occurrence first.
    pub fn append_channel(&mut self, channel_id: i64) {
        self.remove_channel(channel_id);
        self.channels_order.push(channel_id);
    }

    pub fn soft_delete(&mut self) {
        let now = Utc::now();
        self.is_deleted = true;
        self.deleted_at = Some(now);
        self.updated_at = now;
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Repository trait for Category data access operations.
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Find a category by id, including soft-deleted records.
    async fn find_by_id(&self, id: i64) -> Result<Option<Category>, AppError>;

    /// All non-deleted categories, in no particular order.
    async fn find_live(&self) -> Result<Vec<Category>, AppError>;

    /// Insert a new category.
    async fn insert(&self, category: &Category) -> Result<Category, AppError>;

    /// Persist an existing category (last writer wins).
    async fn save(&self, category: &Category) -> Result<Category, AppError>;
}
