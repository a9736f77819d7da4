//! Repository Implementations
//!
//! PostgreSQL implementations of domain repository traits.
//!
//! ## Available Repositories
//!
//! - **UserRepository** - identities and presence
//! - **CredentialRepository** - credential lookups for the handshake
//! - **CategoryRepository** - category chain and channel order
//! - **ChannelRepository** - channels and their category backreference
//! - **MessageRepository** - messages with backwards timeline paging
//! - **RoleRepository** - roles and their permission grants
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use realtime_hub::infrastructure::repositories::pg_store;
//!
//! let store = pg_store(pool);
//! let channel = store.channels.find_by_id(10).await?;
//! ```

pub mod category_repository;
pub mod channel_repository;
pub mod credential_repository;
pub mod message_repository;
pub mod role_repository;
pub mod user_repository;

use std::sync::Arc;

use sqlx::PgPool;

pub use category_repository::PgCategoryRepository;
pub use channel_repository::PgChannelRepository;
pub use credential_repository::PgCredentialRepository;
pub use message_repository::PgMessageRepository;
pub use role_repository::PgRoleRepository;
pub use user_repository::PgUserRepository;

use crate::domain::Store;
use crate::infrastructure::database::{PgStoreProbe, PgUnitOfWork};

/// Wire every PostgreSQL repository into a [`Store`].
pub fn pg_store(pool: PgPool) -> Store {
    Store {
        users: Arc::new(PgUserRepository::new(pool.clone())),
        credentials: Arc::new(PgCredentialRepository::new(pool.clone())),
        categories: Arc::new(PgCategoryRepository::new(pool.clone())),
        channels: Arc::new(PgChannelRepository::new(pool.clone())),
        messages: Arc::new(PgMessageRepository::new(pool.clone())),
        roles: Arc::new(PgRoleRepository::new(pool.clone())),
        unit_of_work: Arc::new(PgUnitOfWork::new(pool.clone())),
        probe: Arc::new(PgStoreProbe::new(pool)),
    }
}
