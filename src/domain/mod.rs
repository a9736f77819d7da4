//! # Domain Layer
//!
//! Entities, value objects and store contracts. No dependency on the
//! transport or on a concrete storage backend.
//!
//! ## Structure
//!
//! - **entities**: User, Credential, Category, Channel, Message, Role
//! - **value_objects**: composite ids and room keys
//! - **store**: repository bundle and unit of work

pub mod entities;
pub mod store;
pub mod value_objects;

// Re-export commonly used types
pub use entities::*;
pub use store::{ChangeSet, Store, StoreProbe, UnitOfWork};
pub use value_objects::*;
