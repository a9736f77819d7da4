//! Domain events and the in-process bus that fans them out.

pub mod bus;
pub mod event;

pub use bus::{EventBus, EventHandler, FnHandler, HandlerOutcome, PublishHandle};
pub use event::{Collection, DomainEvent, Topic, UpdateNotification};
