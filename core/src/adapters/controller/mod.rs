//! Process controller adapters.
//!
//! Platform-specific implementations of termination and port lookup. The
//! strategy is chosen once, at compile time; `ProcessController` forwards
//! every call to it without further dispatch.

#[cfg(unix)]
mod unix;

#[cfg(windows)]
mod windows;

mod parse;

use tracing::debug;

use crate::domain::{PortLookup, ProcessId, TerminationMode};
use crate::error::{Error, Result};
use crate::ports::ProcessControllerPort;

#[cfg(not(any(unix, windows)))]
compile_error!("Unsupported platform: only Unix-like systems and Windows are supported");

/// The main process controller that uses platform-specific implementations.
pub struct ProcessController {
    #[cfg(unix)]
    inner: unix::UnixController,

    #[cfg(windows)]
    inner: windows::WindowsController,
}

impl ProcessController {
    /// Create a new process controller for the current platform.
    pub fn new() -> Self {
        Self {
            #[cfg(unix)]
            inner: unix::UnixController::new(),

            #[cfg(windows)]
            inner: windows::WindowsController::new(),
        }
    }

    /// Request termination of the process tree rooted at `pid`.
    pub async fn terminate(&self, pid: ProcessId, mode: TerminationMode) -> Result<()> {
        self.inner.terminate(pid, mode).await
    }

    /// Find the process listening on `port`.
    ///
    /// Port 0 is rejected before any platform tool runs.
    pub async fn lookup_port(&self, port: u16) -> Result<PortLookup> {
        if port == 0 {
            return Err(Error::InvalidPort(port));
        }

        let lookup = self.inner.lookup_port(port).await?;
        debug!(port = port, pid = ?lookup.pid().map(ProcessId::as_u32), "Port lookup");
        Ok(lookup)
    }
}

impl Default for ProcessController {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessControllerPort for ProcessController {
    async fn terminate(&self, pid: ProcessId, mode: TerminationMode) -> Result<()> {
        ProcessController::terminate(self, pid, mode).await
    }

    async fn lookup_port(&self, port: u16) -> Result<PortLookup> {
        ProcessController::lookup_port(self, port).await
    }
}

/// Internal trait for platform-specific implementations.
trait PlatformControl: Send + Sync {
    fn terminate(
        &self,
        pid: ProcessId,
        mode: TerminationMode,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    fn lookup_port(&self, port: u16) -> impl std::future::Future<Output = Result<PortLookup>> + Send;
}
