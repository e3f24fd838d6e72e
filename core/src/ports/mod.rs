//! Ports layer - Trait definitions (interfaces).
//!
//! This module defines the capabilities the poller and the teardown service
//! depend on. Platform implementations live in `adapters`; the health and
//! registry collaborators are supplied by the caller.

mod collaborators;
mod controller;
mod probe;

pub use collaborators::{HealthCheck, InstanceRegistry};
pub use controller::ProcessControllerPort;
pub use probe::ConvergenceProbe;
