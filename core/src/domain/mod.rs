//! Domain layer - Pure value types.
//!
//! This module contains the transient values that flow between the
//! controller, the poller and their callers. None of them are persisted
//! and none of them cache OS state.

mod binding;
mod process;

// Re-export all domain types
pub use binding::{PortBinding, PortLookup};
pub use process::{ProcessId, TerminationMode};
