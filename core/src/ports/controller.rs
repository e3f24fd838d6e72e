//! Process controller port (interface).

use crate::domain::{PortLookup, ProcessId, TerminationMode};
use crate::error::Result;

/// Port for terminating processes and resolving port ownership.
///
/// Implementations are stateless: every call goes to the OS.
pub trait ProcessControllerPort: Send + Sync {
    /// Request termination of the process tree rooted at `pid`.
    ///
    /// `Ok(())` means the request was issued, not that the process has
    /// exited. Confirm teardown through an observable side effect with the
    /// poller.
    fn terminate(
        &self,
        pid: ProcessId,
        mode: TerminationMode,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Find the process listening on a local TCP port, on any interface.
    fn lookup_port(&self, port: u16) -> impl std::future::Future<Output = Result<PortLookup>> + Send;
}
