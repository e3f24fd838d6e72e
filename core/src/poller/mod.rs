//! Convergence poller.
//!
//! A bounded "wait until the probe holds or the time is up" loop. The poller
//! owns no state between calls and spawns nothing: each wait runs on the
//! caller's task and suspends only in the inter-poll sleep and in the probe
//! itself. Dropping the future cancels the wait.

mod probes;

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::ports::{ConvergenceProbe, HealthCheck, InstanceRegistry};

pub use probes::{probe_fn, FnProbe, HealthExpectation, HealthProbe, PortsClosedProbe, RemovalProbe};

/// Default pause between probe evaluations.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Default bound on a single wait.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Floor applied to the interval so a zero interval never spins.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Timing of a single convergence wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Pause between evaluations.
    pub interval: Duration,
    /// How long to keep polling after the first evaluation.
    pub timeout: Duration,
    /// Absolute cut-off imposed by an enclosing operation, if any.
    pub deadline: Option<Instant>,
}

impl PollOptions {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            deadline: None,
        }
    }

    /// Stop at `deadline` even if `timeout` has not elapsed yet.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// The instant the wait gives up, for a wait started at `start`.
    fn effective_deadline(&self, start: Instant) -> Instant {
        let own = start + self.timeout;
        match self.deadline {
            Some(outer) => own.min(outer),
            None => own,
        }
    }
}

impl Default for PollOptions {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT)
    }
}

/// Evaluate `probe` until it reports `true` or the wait runs out.
///
/// The first evaluation happens immediately. After that the loop sleeps for
/// the interval (never past the deadline) and evaluates again; the last
/// evaluation happens at the deadline itself. Returns whether the probe was
/// satisfied. Non-convergence is never an error at this level.
pub async fn wait_until<P: ConvergenceProbe>(probe: &P, options: &PollOptions) -> bool {
    let start = Instant::now();
    let deadline = options.effective_deadline(start);
    let interval = options.interval.max(MIN_POLL_INTERVAL);
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        if probe.check().await {
            debug!(
                probe = %probe.describe(),
                attempts = attempts,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Converged"
            );
            return true;
        }

        let now = Instant::now();
        if now >= deadline {
            debug!(
                probe = %probe.describe(),
                attempts = attempts,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Did not converge before deadline"
            );
            return false;
        }

        sleep(interval.min(deadline - now)).await;
    }
}

/// Wait until `address` answers its health check.
pub async fn wait_for_address_healthy<H: HealthCheck>(
    checker: &H,
    address: &str,
    options: &PollOptions,
) -> bool {
    let probe = HealthProbe::new(checker, address, HealthExpectation::Healthy);
    wait_until(&probe, options).await
}

/// Wait until `address` stops answering its health check.
pub async fn wait_for_address_unhealthy<H: HealthCheck>(
    checker: &H,
    address: &str,
    options: &PollOptions,
) -> bool {
    let probe = HealthProbe::new(checker, address, HealthExpectation::Unhealthy);
    wait_until(&probe, options).await
}

/// Wait until `address` is no longer listed by `registry`.
pub async fn wait_for_address_removed<R: InstanceRegistry>(
    registry: &R,
    address: &str,
    options: &PollOptions,
) -> bool {
    let probe = RemovalProbe::new(registry, address);
    wait_until(&probe, options).await
}

/// Wait until every port in `ports` refuses connections on `host` in the same check.
pub async fn wait_for_ports_closed(
    host: &str,
    ports: &[u16],
    connect_timeout: Duration,
    options: &PollOptions,
) -> bool {
    let probe = PortsClosedProbe::new(host, ports.to_vec(), connect_timeout);
    wait_until(&probe, options).await
}
