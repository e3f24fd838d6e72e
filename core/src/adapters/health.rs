//! TCP reachability as a health check.

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::ports::HealthCheck;

/// Treats an address as healthy when it accepts a TCP connection.
///
/// Used when no richer liveness query is available for an instance. Any
/// connect error or timeout reads as unhealthy.
#[derive(Debug, Clone)]
pub struct TcpHealthCheck {
    connect_timeout: Duration,
}

impl TcpHealthCheck {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for TcpHealthCheck {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

impl HealthCheck for TcpHealthCheck {
    async fn is_healthy(&self, address: &str) -> bool {
        match timeout(self.connect_timeout, TcpStream::connect(address)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!(address = address, error = %e, "Health check connect failed");
                false
            }
            Err(_) => {
                debug!(address = address, "Health check connect timed out");
                false
            }
        }
    }
}
