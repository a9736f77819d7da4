//! Infrastructure Layer
//!
//! Concrete entity stores and observability plumbing:
//! - PostgreSQL repositories and unit of work
//! - In-memory store for local runs and tests
//! - Prometheus metrics

pub mod database;
pub mod memory;
pub mod metrics;
pub mod repositories;
