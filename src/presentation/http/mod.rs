//! HTTP surface: the gateway upgrade route plus health and metrics.

pub mod handlers;
pub mod routes;
