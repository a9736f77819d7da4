//! Value Objects
//!
//! Immutable value types shared by entities and handlers.

pub mod composite_id;
pub mod room_key;

pub use composite_id::{CompositeId, EntityKind, IdError};
pub use room_key::{RoomKey, RoomKind};
