//! Entity store contracts.
//!
//! The store is a set of per-entity repositories plus a unit of work that
//! applies a multi-document change set atomically. Chain and membership
//! mutations always go through [`UnitOfWork::commit`] so that no reader
//! sees half of a splice.

use std::sync::Arc;

use async_trait::async_trait;

use super::entities::{
    Category, CategoryRepository, Channel, ChannelRepository, CredentialRepository,
    MessageRepository, RoleRepository, UserRepository,
};
use crate::shared::error::AppError;

/// Documents to write together.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub categories: Vec<Category>,
    pub channels: Vec<Channel>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a category, replacing an earlier staged copy of the same id.
    pub fn category(&mut self, category: Category) -> &mut Self {
        self.categories.retain(|c| c.id != category.id);
        self.categories.push(category);
        self
    }

    /// Stage a channel, replacing an earlier staged copy of the same id.
    pub fn channel(&mut self, channel: Channel) -> &mut Self {
        self.channels.retain(|c| c.id != channel.id);
        self.channels.push(channel);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.channels.is_empty()
    }
}

/// Applies change sets all-or-nothing.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Upsert every document of the change set, or none of them.
    async fn commit(&self, changes: ChangeSet) -> Result<(), AppError>;
}

/// Reachability check used by the readiness probe.
#[async_trait]
pub trait StoreProbe: Send + Sync {
    async fn ping(&self) -> Result<(), AppError>;
}

/// Handle to every repository of the configured backend.
#[derive(Clone)]
pub struct Store {
    pub users: Arc<dyn UserRepository>,
    pub credentials: Arc<dyn CredentialRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub channels: Arc<dyn ChannelRepository>,
    pub messages: Arc<dyn MessageRepository>,
    pub roles: Arc<dyn RoleRepository>,
    pub unit_of_work: Arc<dyn UnitOfWork>,
    pub probe: Arc<dyn StoreProbe>,
}
