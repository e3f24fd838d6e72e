//! Port ownership values.

use serde::{Deserialize, Serialize};

use super::ProcessId;

/// A TCP port and the process listening on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortBinding {
    /// The listening port.
    pub port: u16,
    /// The process that owns the listening socket.
    pub pid: ProcessId,
}

impl PortBinding {
    pub fn new(port: u16, pid: ProcessId) -> Self {
        Self { port, pid }
    }
}

/// Outcome of resolving a port to its owning process.
///
/// A failed query is reported through the surrounding `Result`, so callers
/// get three distinct cases: found, no listener, and query failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum PortLookup {
    /// A process is listening on the port.
    Found(PortBinding),
    /// Nothing is listening on the port.
    NotFound,
}

impl PortLookup {
    /// The owning pid, if a listener was found.
    pub fn pid(&self) -> Option<ProcessId> {
        match self {
            PortLookup::Found(binding) => Some(binding.pid),
            PortLookup::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, PortLookup::Found(_))
    }

    /// Build a lookup result from the pids a platform tool reported, in its order.
    pub(crate) fn first_of(port: u16, pids: impl IntoIterator<Item = ProcessId>) -> Self {
        match pids.into_iter().next() {
            Some(pid) => PortLookup::Found(PortBinding::new(port, pid)),
            None => PortLookup::NotFound,
        }
    }
}
