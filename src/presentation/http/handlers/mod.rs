//! HTTP Handlers
//!
//! Operational endpoints. Clients talk to the hub over `/gateway`.

pub mod health;
