//! Application layer - Use case services.
//!
//! Services here are thin orchestrators that:
//! - Accept domain types as inputs
//! - Use ports (traits) for external dependencies
//! - Return domain types as outputs

mod teardown_service;

pub use teardown_service::{TeardownReport, TeardownService};
