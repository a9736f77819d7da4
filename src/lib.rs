//! # Realtime Hub
//!
//! Real-time coordination layer of a chat service:
//! - WebSocket gateway with token handshake and presence tracking
//! - Rooms as named broadcast scopes over live connections
//! - In-process event bus decoupling mutations from fan-out
//! - Ordered category chain and per-category channel ordering
//! - In-memory or PostgreSQL entity store
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **Domain Layer**: entities, value objects and store contracts
//! - **Application Layer**: services, command DTOs and the event bus
//! - **Infrastructure Layer**: store backends and metrics
//! - **Presentation Layer**: HTTP routes and the WebSocket gateway
//!
//! ## Module Structure
//!
//! ```text
//! realtime_hub/
//! +-- config/         Configuration management
//! +-- domain/         Entities, value objects, store traits
//! +-- application/    Services, DTOs, events
//! +-- infrastructure/ PostgreSQL and in-memory stores, metrics
//! +-- presentation/   HTTP routes and WebSocket gateway
//! +-- shared/         Errors, field-error tree, snowflake ids
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Application layer - Business services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP and WebSocket handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
