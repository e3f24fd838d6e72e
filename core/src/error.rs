//! Error types for the teardown-core library.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for teardown operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while terminating processes and resolving ports.
#[derive(Error, Debug)]
pub enum Error {
    /// A process identifier outside `1..=i32::MAX` was supplied.
    #[error("Invalid process id: {0}")]
    InvalidPid(i64),

    /// Port 0 was supplied where a real TCP port is required.
    #[error("Invalid port: {0}")]
    InvalidPort(u16),

    /// Failed to launch a system command.
    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    /// Failed to parse command output.
    #[error("Failed to parse output: {0}")]
    ParseError(String),

    /// No process exists with the given id.
    #[error("Process with PID {0} not found")]
    ProcessNotFound(u32),

    /// The port has a listener but its owning process is hidden from the caller.
    #[error("Port {0} has a listener whose owner is not visible (insufficient privileges)")]
    OwnerNotVisible(u16),

    /// The OS refused to signal the process.
    #[error("Permission denied to kill process {0}")]
    PermissionDenied(u32),

    /// The termination command ran but reported failure.
    #[error("Failed to kill process {pid}: {reason}")]
    KillFailed { pid: u32, reason: String },

    /// A convergence wait ran out of time.
    #[error("Timed out after {waited:?} waiting for {what}")]
    NotConverged { what: String, waited: Duration },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Platform not supported.
    #[error("Platform not supported: {0}")]
    UnsupportedPlatform(String),
}

impl Error {
    /// Whether this error means the target (process or listener) does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::ProcessNotFound(_))
    }
}
