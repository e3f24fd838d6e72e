//! Collaborator ports consumed by the probes.

use crate::error::Result;

/// Liveness query against a running instance.
pub trait HealthCheck: Send + Sync {
    /// Whether the instance at `address` answers its liveness query.
    fn is_healthy(&self, address: &str) -> impl std::future::Future<Output = bool> + Send;
}

/// Registry of active instances kept by the instance manager.
pub trait InstanceRegistry: Send + Sync {
    /// The addresses currently registered as active.
    fn list_addresses(&self) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
}
