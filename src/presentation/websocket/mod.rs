//! WebSocket Gateway
//!
//! Real-time transport: connection registry, sessions, rooms, command
//! dispatch and the bus subscribers that fan events out.

pub mod commands;
pub mod gateway;
pub mod handler;
pub mod messages;
pub mod rooms;
pub mod senders;
pub mod session;

pub use commands::{Command, CommandDispatcher};
pub use gateway::Gateway;
pub use handler::ws_handler;
pub use messages::{InboundFrame, OutboundFrame};
pub use rooms::RoomRegistry;
pub use senders::register_senders;
pub use session::{Session, SessionManager};
