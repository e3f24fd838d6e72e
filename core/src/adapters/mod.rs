//! Adapters layer - External system implementations.
//!
//! This module contains implementations of the port traits defined in `ports`.
//! Each adapter handles communication with the operating system.

pub mod controller;
pub mod health;

// Re-export main types for convenience
pub use controller::ProcessController;
pub use health::TcpHealthCheck;
