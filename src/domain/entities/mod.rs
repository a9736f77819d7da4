//! # Domain Entities
//!
//! Persisted entities the coordination layer reads and mutates.
//!
//! - **User**: identity with presence flag and last-seen timestamp
//! - **Credential**: login record bound to a user (consulted at handshake)
//! - **Category**: chain node holding an ordered list of channels
//! - **Channel**: broadcast target with a backreference to its category
//! - **Message**: content addressed to a room
//! - **Role**: named set of permission grants, restorable after deletion
//!
//! Each entity has an associated repository trait implemented in the
//! infrastructure layer.

mod category;
mod channel;
mod credential;
mod message;
mod role;
mod user;

pub use category::{Category, CategoryRepository};
pub use channel::{Channel, ChannelRepository, ChannelType};
pub use credential::{Credential, CredentialRepository};
pub use message::{Message, MessageRepository, MessageType};
pub use role::{Permission, PermissionType, Role, RoleRepository};
pub use user::{PublicUser, User, UserRepository};
