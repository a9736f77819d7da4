//! Application Layer
//!
//! Services that validate and apply mutations, the DTOs exchanged with
//! clients, and the event bus that fans results out.

pub mod dto;
pub mod events;
pub mod services;
