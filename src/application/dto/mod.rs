//! Data Transfer Objects
//!
//! Command payloads and the envelopes sent back over the gateway.

pub mod request;
pub mod response;

pub use request::*;
pub use response::*;
