//! Concrete convergence probes.

use std::future::Future;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::ports::{ConvergenceProbe, HealthCheck, InstanceRegistry};

// ============================================================================
// FnProbe
// ============================================================================

/// Adapts an async closure into a probe.
pub struct FnProbe<F> {
    f: F,
    label: String,
}

/// Build a probe from a closure returning a `bool` future.
pub fn probe_fn<F, Fut>(f: F) -> FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = bool> + Send,
{
    FnProbe {
        f,
        label: "custom probe".to_string(),
    }
}

impl<F> FnProbe<F> {
    /// Name the probe for logs and timeout errors.
    pub fn labelled(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

impl<F, Fut> ConvergenceProbe for FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = bool> + Send,
{
    fn check(&self) -> impl Future<Output = bool> + Send {
        (self.f)()
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

// ============================================================================
// PortsClosedProbe
// ============================================================================

/// Satisfied when every port refuses connections in the same evaluation.
///
/// A refused connection, any other connect error and a connect timeout all
/// count as closed.
#[derive(Debug, Clone)]
pub struct PortsClosedProbe {
    host: String,
    ports: Vec<u16>,
    connect_timeout: Duration,
}

impl PortsClosedProbe {
    pub fn new(host: impl Into<String>, ports: Vec<u16>, connect_timeout: Duration) -> Self {
        Self {
            host: host.into(),
            ports,
            connect_timeout,
        }
    }

    pub fn ports(&self) -> &[u16] {
        &self.ports
    }

    async fn is_port_open(&self, port: u16) -> bool {
        let target = (self.host.as_str(), port);
        matches!(timeout(self.connect_timeout, TcpStream::connect(target)).await, Ok(Ok(_)))
    }
}

impl ConvergenceProbe for PortsClosedProbe {
    async fn check(&self) -> bool {
        for &port in &self.ports {
            if self.is_port_open(port).await {
                debug!(host = %self.host, port = port, "Port still accepting connections");
                return false;
            }
        }
        true
    }

    fn describe(&self) -> String {
        format!("ports {:?} on {} to close", self.ports, self.host)
    }
}

// ============================================================================
// HealthProbe
// ============================================================================

/// Which side of the health check a `HealthProbe` waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthExpectation {
    /// Wait for the address to start answering (after starting an instance).
    Healthy,
    /// Wait for the address to stop answering (after stopping one).
    Unhealthy,
}

/// Satisfied when the health of an address matches the expectation.
pub struct HealthProbe<'a, H> {
    checker: &'a H,
    address: String,
    expect: HealthExpectation,
}

impl<'a, H: HealthCheck> HealthProbe<'a, H> {
    pub fn new(checker: &'a H, address: impl Into<String>, expect: HealthExpectation) -> Self {
        Self {
            checker,
            address: address.into(),
            expect,
        }
    }
}

impl<H: HealthCheck> ConvergenceProbe for HealthProbe<'_, H> {
    async fn check(&self) -> bool {
        let healthy = self.checker.is_healthy(&self.address).await;
        match self.expect {
            HealthExpectation::Healthy => healthy,
            HealthExpectation::Unhealthy => !healthy,
        }
    }

    fn describe(&self) -> String {
        match self.expect {
            HealthExpectation::Healthy => format!("{} to become healthy", self.address),
            HealthExpectation::Unhealthy => format!("{} to stop responding", self.address),
        }
    }
}

// ============================================================================
// RemovalProbe
// ============================================================================

/// Satisfied when the registry lists successfully and the address is absent.
///
/// A failed listing is treated as "not yet", never as removal.
pub struct RemovalProbe<'a, R> {
    registry: &'a R,
    address: String,
}

impl<'a, R: InstanceRegistry> RemovalProbe<'a, R> {
    pub fn new(registry: &'a R, address: impl Into<String>) -> Self {
        Self {
            registry,
            address: address.into(),
        }
    }
}

impl<R: InstanceRegistry> ConvergenceProbe for RemovalProbe<'_, R> {
    async fn check(&self) -> bool {
        match self.registry.list_addresses().await {
            Ok(addresses) => !addresses.iter().any(|a| a == &self.address),
            Err(e) => {
                debug!(address = %self.address, error = %e, "Registry listing failed");
                false
            }
        }
    }

    fn describe(&self) -> String {
        format!("{} to leave the registry", self.address)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use parking_lot::{Mutex, RwLock};
    use tokio::net::TcpListener;

    use super::*;
    use crate::error::{Error, Result};

    /// Mock health check with a switchable answer.
    struct MockHealth {
        healthy: RwLock<bool>,
    }

    impl HealthCheck for MockHealth {
        async fn is_healthy(&self, _address: &str) -> bool {
            *self.healthy.read()
        }
    }

    /// Mock registry replaying scripted listings.
    struct MockRegistry {
        listings: Mutex<VecDeque<Result<Vec<String>>>>,
    }

    impl MockRegistry {
        fn new(listings: Vec<Result<Vec<String>>>) -> Self {
            Self {
                listings: Mutex::new(listings.into()),
            }
        }
    }

    impl InstanceRegistry for MockRegistry {
        async fn list_addresses(&self) -> Result<Vec<String>> {
            self.listings.lock().pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    async fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn test_ports_closed_requires_every_port() {
        let open = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let open_port = open.local_addr().unwrap().port();
        let closed = closed_port().await;

        let timeout = Duration::from_millis(200);
        let all_closed = PortsClosedProbe::new("127.0.0.1", vec![closed], timeout);
        assert!(all_closed.check().await);

        let mixed = PortsClosedProbe::new("127.0.0.1", vec![closed, open_port], timeout);
        assert!(!mixed.check().await);

        drop(open);
        assert!(mixed.check().await);
    }

    #[tokio::test]
    async fn test_ports_closed_empty_set_is_satisfied() {
        let probe = PortsClosedProbe::new("127.0.0.1", Vec::new(), Duration::from_millis(100));
        assert!(probe.check().await);
        assert!(probe.ports().is_empty());
    }

    #[tokio::test]
    async fn test_health_probe_expectations() {
        let checker = MockHealth {
            healthy: RwLock::new(false),
        };
        let up = HealthProbe::new(&checker, "127.0.0.1:1", HealthExpectation::Healthy);
        let down = HealthProbe::new(&checker, "127.0.0.1:1", HealthExpectation::Unhealthy);

        assert!(!up.check().await);
        assert!(down.check().await);

        *checker.healthy.write() = true;
        assert!(up.check().await);
        assert!(!down.check().await);
        assert!(up.describe().contains("healthy"));
    }

    #[tokio::test]
    async fn test_removal_probe_treats_listing_errors_as_pending() {
        let registry = MockRegistry::new(vec![
            Ok(vec!["127.0.0.1:5000".to_string(), "127.0.0.1:6000".to_string()]),
            Err(Error::CommandFailed("registry unavailable".to_string())),
            Ok(vec!["127.0.0.1:6000".to_string()]),
        ]);
        let probe = RemovalProbe::new(&registry, "127.0.0.1:5000");

        assert!(!probe.check().await);
        assert!(!probe.check().await);
        assert!(probe.check().await);
    }

    #[test]
    fn test_descriptions_name_their_target() {
        let probe = PortsClosedProbe::new("127.0.0.1", vec![3000, 3001], Duration::from_millis(10));
        assert_eq!(probe.describe(), "ports [3000, 3001] on 127.0.0.1 to close");

        let custom = probe_fn(|| async { true }).labelled("instance ready");
        assert_eq!(custom.describe(), "instance ready");
    }
}
