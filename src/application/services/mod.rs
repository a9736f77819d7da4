//! Application Services
//!
//! Business logic services that coordinate domain operations.
//!
//! ## Available Services
//!
//! - **ChainCoordinator**: category chain and channel membership mutations
//! - **ChannelService**: channel creation
//! - **MessageService**: message send, edit, delete and timeline paging
//! - **RoleService**: roles and their permission grants
//! - **CredentialGateway**: bearer token verification

pub mod auth_service;
pub mod chain_service;
pub mod channel_service;
pub mod message_service;
pub mod role_service;

pub use auth_service::{Claims, CredentialGateway, JwtCredentialGateway, VerifiedToken};
pub use chain_service::{chain_order, CategoryRemoval, ChainCoordinator, ChannelPlacement};
pub use channel_service::{ChannelService, ChannelServiceImpl, CreateChannelDto, CreatedChannel};
pub use message_service::{parse_until, MessageService, MessageServiceImpl};
pub use role_service::{RoleChanges, RoleService, RoleServiceImpl};
