//! Teardown application service.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::TeardownConfig;
use crate::domain::{PortLookup, ProcessId, TerminationMode};
use crate::error::{Error, Result};
use crate::poller::{wait_until, PollOptions, PortsClosedProbe};
use crate::ports::{ConvergenceProbe, ProcessControllerPort};

/// What a teardown did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeardownReport {
    /// The process that was signalled, or `None` if nothing owned the port.
    pub pid: Option<ProcessId>,
    pub mode: TerminationMode,
    /// Ports confirmed closed afterwards.
    pub ports: Vec<u16>,
    /// Time from the termination request until the ports were confirmed closed.
    pub elapsed_ms: u64,
}

/// Application service for stopping instances and confirming release.
///
/// Resolves a port to its owner, requests termination, then polls until the
/// ports stop accepting connections. Unlike the bare poller, a wait that runs
/// out is returned as `Error::NotConverged` naming the pid and ports.
pub struct TeardownService<C: ProcessControllerPort> {
    controller: C,
    host: String,
    connect_timeout: Duration,
}

impl<C: ProcessControllerPort> TeardownService<C> {
    /// Create a new teardown service with the given controller.
    pub fn new(controller: C, config: &TeardownConfig) -> Self {
        Self {
            controller,
            host: config.host.clone(),
            connect_timeout: config.connect_timeout(),
        }
    }

    /// The underlying process controller.
    pub fn controller(&self) -> &C {
        &self.controller
    }

    /// Find the process listening on `port`.
    pub async fn resolve(&self, port: u16) -> Result<PortLookup> {
        self.controller.lookup_port(port).await
    }

    /// Terminate `pid` and wait until every port in `ports` is closed.
    pub async fn stop_pid(
        &self,
        pid: ProcessId,
        mode: TerminationMode,
        ports: &[u16],
        options: &PollOptions,
    ) -> Result<TeardownReport> {
        info!(pid = pid.as_u32(), mode = %mode, ports = ?ports, "Stopping process");
        self.controller.terminate(pid, mode).await?;

        let start = Instant::now();
        if !ports.is_empty() {
            let probe = PortsClosedProbe::new(self.host.as_str(), ports.to_vec(), self.connect_timeout);
            if !wait_until(&probe, options).await {
                let waited = start.elapsed();
                warn!(pid = pid.as_u32(), ports = ?ports, waited_ms = waited.as_millis() as u64, "Ports still open");
                return Err(Error::NotConverged {
                    what: format!("pid {} to release {}", pid, probe.describe()),
                    waited,
                });
            }
        }

        Ok(TeardownReport {
            pid: Some(pid),
            mode,
            ports: ports.to_vec(),
            elapsed_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Terminate whatever listens on `port` and wait for the port to close.
    ///
    /// A port with no listener is already torn down and reports `pid: None`.
    pub async fn stop_port(
        &self,
        port: u16,
        mode: TerminationMode,
        options: &PollOptions,
    ) -> Result<TeardownReport> {
        match self.resolve(port).await? {
            PortLookup::Found(binding) => {
                self.stop_pid(binding.pid, mode, &[port], options).await
            }
            PortLookup::NotFound => {
                debug!(port = port, "No listener, nothing to stop");
                Ok(TeardownReport {
                    pid: None,
                    mode,
                    ports: vec![port],
                    elapsed_ms: 0,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::net::TcpListener;

    use parking_lot::Mutex;
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::domain::PortBinding;

    /// Mock controller whose "processes" are listeners held in memory.
    struct MockController {
        listeners: Mutex<HashMap<u16, (ProcessId, Option<TcpListener>)>>,
        /// When set, terminate succeeds but leaves the sockets open.
        stubborn: bool,
    }

    impl MockController {
        fn new(stubborn: bool) -> Self {
            Self {
                listeners: Mutex::new(HashMap::new()),
                stubborn,
            }
        }

        fn spawn(&self, raw_pid: i64) -> u16 {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let port = listener.local_addr().unwrap().port();
            let pid = ProcessId::new(raw_pid).unwrap();
            self.listeners.lock().insert(port, (pid, Some(listener)));
            port
        }
    }

    impl ProcessControllerPort for MockController {
        async fn terminate(&self, pid: ProcessId, _mode: TerminationMode) -> Result<()> {
            let mut listeners = self.listeners.lock();
            let mut found = false;
            for (owner, listener) in listeners.values_mut() {
                if *owner == pid {
                    found = true;
                    if !self.stubborn {
                        listener.take();
                    }
                }
            }
            if found {
                Ok(())
            } else {
                Err(Error::ProcessNotFound(pid.as_u32()))
            }
        }

        async fn lookup_port(&self, port: u16) -> Result<PortLookup> {
            let listeners = self.listeners.lock();
            Ok(match listeners.get(&port) {
                Some((pid, Some(_))) => PortLookup::Found(PortBinding::new(port, *pid)),
                _ => PortLookup::NotFound,
            })
        }
    }

    fn fast_options() -> PollOptions {
        PollOptions::new(Duration::from_millis(20), Duration::from_secs(2))
    }

    #[tokio::test]
    async fn test_stop_port_terminates_owner_and_waits() {
        let controller = MockController::new(false);
        let port = controller.spawn(4100);
        let service = TeardownService::new(controller, &TeardownConfig::default());

        let report = assert_ok!(
            service
                .stop_port(port, TerminationMode::Forced, &fast_options())
                .await
        );
        assert_eq!(report.pid, Some(ProcessId::new(4100).unwrap()));
        assert_eq!(report.ports, vec![port]);
        assert_eq!(report.mode, TerminationMode::Forced);

        assert_eq!(assert_ok!(service.resolve(port).await), PortLookup::NotFound);
    }

    #[tokio::test]
    async fn test_stop_port_without_listener_is_noop() {
        let service = TeardownService::new(MockController::new(false), &TeardownConfig::default());

        let report = assert_ok!(
            service
                .stop_port(1, TerminationMode::Graceful, &fast_options())
                .await
        );
        assert_eq!(report.pid, None);
        assert_eq!(report.elapsed_ms, 0);
    }

    #[tokio::test]
    async fn test_stop_pid_waits_on_every_port() {
        let controller = MockController::new(false);
        let core_port = controller.spawn(4200);
        let host_port = controller.spawn(4200);
        let service = TeardownService::new(controller, &TeardownConfig::default());

        let pid = ProcessId::new(4200).unwrap();
        let report = assert_ok!(
            service
                .stop_pid(pid, TerminationMode::Graceful, &[core_port, host_port], &fast_options())
                .await
        );
        assert_eq!(report.ports, vec![core_port, host_port]);
    }

    #[tokio::test]
    async fn test_stop_pid_reports_context_when_ports_stay_open() {
        let controller = MockController::new(true);
        let port = controller.spawn(4300);
        let service = TeardownService::new(controller, &TeardownConfig::default());

        let options = PollOptions::new(Duration::from_millis(20), Duration::from_millis(200));
        let pid = ProcessId::new(4300).unwrap();
        let err = assert_err!(
            service
                .stop_pid(pid, TerminationMode::Forced, &[port], &options)
                .await
        );

        match err {
            Error::NotConverged { what, waited } => {
                assert!(what.contains("pid 4300"));
                assert!(what.contains(&port.to_string()));
                assert!(waited >= Duration::from_millis(200));
            }
            other => panic!("Unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_stop_pid_surfaces_termination_errors() {
        let service = TeardownService::new(MockController::new(false), &TeardownConfig::default());
        let pid = ProcessId::new(999).unwrap();

        let err = assert_err!(
            service
                .stop_pid(pid, TerminationMode::Forced, &[], &fast_options())
                .await
        );
        assert!(err.is_not_found());
    }

    /// Controller that sees a listener on every port but never its owner.
    struct HiddenOwnerController;

    impl ProcessControllerPort for HiddenOwnerController {
        async fn terminate(&self, pid: ProcessId, _mode: TerminationMode) -> Result<()> {
            Err(Error::PermissionDenied(pid.as_u32()))
        }

        async fn lookup_port(&self, port: u16) -> Result<PortLookup> {
            Err(Error::OwnerNotVisible(port))
        }
    }

    #[tokio::test]
    async fn test_stop_port_with_hidden_owner_is_an_error() {
        let service = TeardownService::new(HiddenOwnerController, &TeardownConfig::default());

        let err = assert_err!(
            service
                .stop_port(5432, TerminationMode::Forced, &fast_options())
                .await
        );
        assert!(matches!(err, Error::OwnerNotVisible(5432)));
    }

    #[test]
    fn test_report_json_shape() {
        let report = TeardownReport {
            pid: Some(ProcessId::new(12).unwrap()),
            mode: TerminationMode::Forced,
            ports: vec![31234],
            elapsed_ms: 40,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["pid"], 12);
        assert_eq!(json["mode"], "forced");
        assert_eq!(json["elapsedMs"], 40);
    }
}
