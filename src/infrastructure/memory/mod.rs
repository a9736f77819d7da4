//! In-memory entity store.
//!
//! Backs every repository with a `HashMap` behind a `parking_lot` lock.
//! Used for local runs and the test suite. Change sets are applied while
//! holding the category and channel write locks together, so readers never
//! observe half of a commit.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::domain::{
    Category, CategoryRepository, ChangeSet, Channel, ChannelRepository, Credential,
    CredentialRepository, Message, MessageRepository, Role, RoleRepository, RoomKey, Store,
    StoreProbe, UnitOfWork, User, UserRepository,
};
use crate::shared::error::AppError;

#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<i64, User>>,
    credentials: RwLock<HashMap<i64, Credential>>,
    categories: RwLock<HashMap<i64, Category>>,
    channels: RwLock<HashMap<i64, Channel>>,
    messages: RwLock<HashMap<i64, Message>>,
    roles: RwLock<HashMap<i64, Role>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Expose this store through the repository handles.
    pub fn into_store(self: Arc<Self>) -> Store {
        Store {
            users: self.clone(),
            credentials: self.clone(),
            categories: self.clone(),
            channels: self.clone(),
            messages: self.clone(),
            roles: self.clone(),
            unit_of_work: self.clone(),
            probe: self,
        }
    }
}

fn duplicate(what: &str, id: i64) -> AppError {
    AppError::Store(format!("{} {} already exists", what, id))
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.users.read().get(&id).cloned())
    }

    async fn insert(&self, user: &User) -> Result<User, AppError> {
        let mut users = self.users.write();
        if users.contains_key(&user.id) {
            return Err(duplicate("User", user.id));
        }
        users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn save(&self, user: &User) -> Result<User, AppError> {
        self.users.write().insert(user.id, user.clone());
        Ok(user.clone())
    }
}

#[async_trait]
impl CredentialRepository for MemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Credential>, AppError> {
        Ok(self
            .credentials
            .read()
            .get(&id)
            .filter(|c| !c.is_deleted)
            .cloned())
    }

    async fn find_by_user_id(&self, user_id: i64) -> Result<Option<Credential>, AppError> {
        Ok(self
            .credentials
            .read()
            .values()
            .find(|c| c.user_id == user_id && !c.is_deleted)
            .cloned())
    }

    async fn insert(&self, credential: &Credential) -> Result<Credential, AppError> {
        let mut credentials = self.credentials.write();
        if credentials.contains_key(&credential.id) {
            return Err(duplicate("Credential", credential.id));
        }
        credentials.insert(credential.id, credential.clone());
        Ok(credential.clone())
    }
}

#[async_trait]
impl CategoryRepository for MemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Category>, AppError> {
        Ok(self.categories.read().get(&id).cloned())
    }

    async fn find_live(&self) -> Result<Vec<Category>, AppError> {
        Ok(self
            .categories
            .read()
            .values()
            .filter(|c| !c.is_deleted)
            .cloned()
            .collect())
    }

    async fn insert(&self, category: &Category) -> Result<Category, AppError> {
        let mut categories = self.categories.write();
        if categories.contains_key(&category.id) {
            return Err(duplicate("Category", category.id));
        }
        categories.insert(category.id, category.clone());
        Ok(category.clone())
    }

    async fn save(&self, category: &Category) -> Result<Category, AppError> {
        self.categories.write().insert(category.id, category.clone());
        Ok(category.clone())
    }
}

#[async_trait]
impl ChannelRepository for MemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Channel>, AppError> {
        Ok(self.channels.read().get(&id).cloned())
    }

    async fn insert(&self, channel: &Channel) -> Result<Channel, AppError> {
        let mut channels = self.channels.write();
        if channels.contains_key(&channel.id) {
            return Err(duplicate("Channel", channel.id));
        }
        channels.insert(channel.id, channel.clone());
        Ok(channel.clone())
    }

    async fn save(&self, channel: &Channel) -> Result<Channel, AppError> {
        self.channels.write().insert(channel.id, channel.clone());
        Ok(channel.clone())
    }
}

#[async_trait]
impl MessageRepository for MemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Message>, AppError> {
        Ok(self.messages.read().get(&id).cloned())
    }

    async fn find_timeline(
        &self,
        room: &RoomKey,
        until: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Message>, AppError> {
        let mut page: Vec<Message> = self
            .messages
            .read()
            .values()
            .filter(|m| !m.is_deleted && m.sent_to == *room && m.created_at < until)
            .cloned()
            .collect();
        page.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        page.truncate(limit);
        Ok(page)
    }

    async fn insert(&self, message: &Message) -> Result<Message, AppError> {
        let mut messages = self.messages.write();
        if messages.contains_key(&message.id) {
            return Err(duplicate("Message", message.id));
        }
        messages.insert(message.id, message.clone());
        Ok(message.clone())
    }

    async fn save(&self, message: &Message) -> Result<Message, AppError> {
        self.messages.write().insert(message.id, message.clone());
        Ok(message.clone())
    }
}

#[async_trait]
impl UnitOfWork for MemoryStore {
    async fn commit(&self, changes: ChangeSet) -> Result<(), AppError> {
        let mut categories = self.categories.write();
        let mut channels = self.channels.write();
        for category in changes.categories {
            categories.insert(category.id, category);
        }
        for channel in changes.channels {
            channels.insert(channel.id, channel);
        }
        Ok(())
    }
}

#[async_trait]
impl RoleRepository for MemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Role>, AppError> {
        Ok(self.roles.read().get(&id).cloned())
    }

    async fn find_all(&self, include_deleted: bool) -> Result<Vec<Role>, AppError> {
        let mut roles: Vec<Role> = self
            .roles
            .read()
            .values()
            .filter(|r| include_deleted || !r.is_deleted)
            .cloned()
            .collect();
        roles.sort_by_key(|r| (r.created_at, r.id));
        Ok(roles)
    }

    async fn insert(&self, role: &Role) -> Result<Role, AppError> {
        let mut roles = self.roles.write();
        if roles.contains_key(&role.id) {
            return Err(duplicate("Role", role.id));
        }
        roles.insert(role.id, role.clone());
        Ok(role.clone())
    }

    async fn save(&self, role: &Role) -> Result<Role, AppError> {
        self.roles.write().insert(role.id, role.clone());
        Ok(role.clone())
    }
}

#[async_trait]
impl StoreProbe for MemoryStore {
    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}
