//! Teardown Core Library
//!
//! Cross-platform process and port lifecycle control for end-to-end tests.
//! Provides functionality to:
//! - Terminate a process tree by PID (gracefully or forcefully)
//! - Resolve which process is listening on a TCP port
//! - Poll until an asynchronous teardown effect is observable
//!   (port closed, address unhealthy, instance gone from a registry)
//!
//! # Architecture
//! This library follows hexagonal architecture (ports & adapters):
//! - `domain`: Value types (pids, termination modes, port lookups)
//! - `ports`: Trait definitions (interfaces)
//! - `adapters`: Platform implementations
//! - `poller`: The convergence loop and its probes
//! - `application`: Use case services
//!
//! # Platform Support
//! - Linux: `kill(2)` for signals, `ss` (or `lsof`) for port owners, `ps` for the process tree
//! - macOS and other Unix: `kill(2)`, `lsof`, `ps`
//! - Windows: `taskkill /T` and `netstat -ano`

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod poller;
pub mod ports;

// Re-export domain types (primary API)
pub use domain::{PortBinding, PortLookup, ProcessId, TerminationMode};

// Re-export other commonly used types
pub use adapters::{ProcessController, TcpHealthCheck};
pub use application::{TeardownReport, TeardownService};
pub use config::{ConfigStore, TeardownConfig};
pub use error::{Error, Result};
pub use poller::{
    probe_fn, wait_for_address_healthy, wait_for_address_removed, wait_for_address_unhealthy,
    wait_for_ports_closed, wait_until, HealthExpectation, HealthProbe, PollOptions,
    PortsClosedProbe, RemovalProbe,
};
pub use ports::{ConvergenceProbe, HealthCheck, InstanceRegistry, ProcessControllerPort};
