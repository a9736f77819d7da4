//! Channel Service
//!
//! Channel creation. Placement into categories is delegated to the
//! [`ChainCoordinator`] so membership stays consistent.

use std::sync::Arc;

use async_trait::async_trait;

use super::chain_service::{ChainCoordinator, ChannelPlacement};
use crate::domain::{Channel, ChannelType, Store};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

/// New channel parameters
#[derive(Debug, Clone)]
pub struct CreateChannelDto {
    pub name: String,
    pub description: String,
    pub channel_type: ChannelType,
    pub category_id: Option<i64>,
}

/// Outcome of creating a channel
#[derive(Debug, Clone)]
pub struct CreatedChannel {
    pub channel: Channel,
    pub placement: Option<ChannelPlacement>,
}

/// Channel service trait
#[async_trait]
pub trait ChannelService: Send + Sync {
    async fn create_channel(&self, request: CreateChannelDto) -> Result<CreatedChannel, AppError>;
}

/// ChannelService implementation
pub struct ChannelServiceImpl {
    store: Store,
    chain: Arc<ChainCoordinator>,
    ids: Arc<SnowflakeGenerator>,
}

impl ChannelServiceImpl {
    pub fn new(store: Store, chain: Arc<ChainCoordinator>, ids: Arc<SnowflakeGenerator>) -> Self {
        Self { store, chain, ids }
    }
}

#[async_trait]
impl ChannelService for ChannelServiceImpl {
    async fn create_channel(&self, request: CreateChannelDto) -> Result<CreatedChannel, AppError> {
        let channel = Channel::new(
            self.ids.generate(),
            request.name,
            request.description,
            request.channel_type,
        );

        match request.category_id {
            Some(category_id) => {
                let placement = self.chain.insert_channel_into(category_id, channel).await?;
                Ok(CreatedChannel {
                    channel: placement.channel.clone(),
                    placement: Some(placement),
                })
            }
            None => {
                let channel = self.store.channels.insert(&channel).await?;
                tracing::info!(channel_id = channel.id, "Channel created");
                Ok(CreatedChannel {
                    channel,
                    placement: None,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Category, ChangeSet, ChannelRepository, UnitOfWork};
    use crate::infrastructure::memory::MemoryStore;
    use parking_lot::Mutex;

    /// Records every channel id written through either write path.
    struct Recorder {
        channels: Arc<dyn ChannelRepository>,
        unit_of_work: Arc<dyn UnitOfWork>,
        written: Mutex<Vec<i64>>,
    }

    #[async_trait]
    impl ChannelRepository for Recorder {
        async fn find_by_id(&self, id: i64) -> Result<Option<Channel>, AppError> {
            self.channels.find_by_id(id).await
        }

        async fn insert(&self, channel: &Channel) -> Result<Channel, AppError> {
            self.written.lock().push(channel.id);
            self.channels.insert(channel).await
        }

        async fn save(&self, channel: &Channel) -> Result<Channel, AppError> {
            self.written.lock().push(channel.id);
            self.channels.save(channel).await
        }
    }

    #[async_trait]
    impl UnitOfWork for Recorder {
        async fn commit(&self, changes: ChangeSet) -> Result<(), AppError> {
            self.written
                .lock()
                .extend(changes.channels.iter().map(|c| c.id));
            self.unit_of_work.commit(changes).await
        }
    }

    fn service() -> (Store, Arc<Recorder>, ChannelServiceImpl) {
        let mut store = MemoryStore::new().into_store();
        let recorder = Arc::new(Recorder {
            channels: store.channels.clone(),
            unit_of_work: store.unit_of_work.clone(),
            written: Mutex::new(Vec::new()),
        });
        store.channels = recorder.clone();
        store.unit_of_work = recorder.clone();

        let ids = Arc::new(SnowflakeGenerator::new(1, 1));
        let chain = Arc::new(ChainCoordinator::new(store.clone(), ids.clone()));
        (store.clone(), recorder, ChannelServiceImpl::new(store, chain, ids))
    }

    fn request(category_id: Option<i64>) -> CreateChannelDto {
        CreateChannelDto {
            name: "lobby".into(),
            description: String::new(),
            channel_type: ChannelType::Voice,
            category_id,
        }
    }

    #[tokio::test]
    async fn test_create_channel_in_category() {
        let (store, recorder, service) = service();
        store
            .categories
            .insert(&Category::new(1, "General", None))
            .await
            .unwrap();

        let created = service.create_channel(request(Some(1))).await.unwrap();

        let category = store.categories.find_by_id(1).await.unwrap().unwrap();
        assert_eq!(category.channels_order, vec![created.channel.id]);
        assert_eq!(created.channel.category_id, Some(1));
        let stored = store.channels.find_by_id(created.channel.id).await.unwrap();
        assert_eq!(stored.unwrap().category_id, Some(1));
        assert_eq!(*recorder.written.lock(), vec![created.channel.id]);
    }

    #[tokio::test]
    async fn test_unknown_category_leaves_no_channel_behind() {
        let (_, recorder, service) = service();

        let result = service.create_channel(request(Some(404))).await;

        assert!(matches!(result, Err(AppError::Reference(_))));
        assert!(recorder.written.lock().is_empty());
    }

    #[tokio::test]
    async fn test_create_uncategorized_channel() {
        let (store, _, service) = service();

        let created = service.create_channel(request(None)).await.unwrap();

        assert!(created.placement.is_none());
        let stored = store.channels.find_by_id(created.channel.id).await.unwrap();
        assert_eq!(stored.unwrap().category_id, None);
    }
}
