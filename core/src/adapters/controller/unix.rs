//! Unix process controller implementation
//!
//! Uses the following:
//! - `kill(2)` / `killpg(2)` through `nix` for SIGTERM (graceful) and SIGKILL (forced)
//! - `ps -A -o pid=,ppid=` to enumerate the process tree before signalling
//! - `ss -Htlnp` (Linux) or `lsof -t -sTCP:LISTEN` to find the owner of a listening port

use std::io::ErrorKind;
use std::process::Stdio;

use nix::errno::Errno;
use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::{getpgid, Pid};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::domain::{PortLookup, ProcessId, TerminationMode};
use crate::error::{Error, Result};

use super::parse;
use super::PlatformControl;

/// Unix process controller.
///
/// Signals the root first so its failure surfaces unchanged, then the root's
/// process group (when it leads one) and every descendant captured before
/// the root was signalled.
#[derive(Debug, Default)]
pub struct UnixController;

impl UnixController {
    /// Create a new UnixController instance
    pub fn new() -> Self {
        Self
    }

    fn signal_for(mode: TerminationMode) -> Signal {
        match mode {
            TerminationMode::Graceful => Signal::SIGTERM,
            TerminationMode::Forced => Signal::SIGKILL,
        }
    }

    /// Send `signal` to the root pid, mapping errno to the error taxonomy.
    fn signal_root(pid: ProcessId, signal: Signal) -> Result<()> {
        debug!(pid = pid.as_u32(), signal = %signal, "Sending signal to process");

        match kill(Pid::from_raw(pid.as_i32()), signal) {
            Ok(()) => Ok(()),
            Err(Errno::ESRCH) => Err(Error::ProcessNotFound(pid.as_u32())),
            Err(Errno::EPERM) => {
                warn!(pid = pid.as_u32(), "Permission denied to kill process");
                Err(Error::PermissionDenied(pid.as_u32()))
            }
            Err(errno) => Err(Error::KillFailed {
                pid: pid.as_u32(),
                reason: errno.desc().to_string(),
            }),
        }
    }

    /// Signal the process group led by `pid`, if it leads one.
    fn signal_group(pid: ProcessId, signal: Signal) {
        let nix_pid = Pid::from_raw(pid.as_i32());
        match getpgid(Some(nix_pid)) {
            Ok(pgid) if pgid == nix_pid => {
                if let Err(errno) = killpg(pgid, signal) {
                    debug!(pgid = pid.as_u32(), error = %errno, "Process group signal failed");
                }
            }
            Ok(_) => {}
            Err(errno) => debug!(pid = pid.as_u32(), error = %errno, "getpgid failed"),
        }
    }

    /// Snapshot the descendants of `pid` from the process table.
    async fn descendants(&self, pid: ProcessId) -> Result<Vec<u32>> {
        let output = Command::new("ps")
            .args(["-A", "-o", "pid=,ppid="])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::CommandFailed(format!("Failed to run ps: {}", e)))?;

        if !output.status.success() {
            return Err(Error::CommandFailed(format!(
                "ps failed with status: {}",
                output.status
            )));
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|e| Error::ParseError(format!("Invalid UTF-8 in ps output: {}", e)))?;

        let table = parse::parse_ps_table(&stdout);
        Ok(parse::descendants(pid.as_u32(), &table))
    }

    /// Query `ss` for listeners on `port`.
    ///
    /// Returns `Ok(None)` when `ss` is not installed so the caller can fall back.
    async fn lookup_with_ss(&self, port: u16) -> Result<Option<parse::SsListeners>> {
        let filter = format!(":{}", port);
        let output = match Command::new("ss")
            .args(["-Htlnp", "sport", "=", &filter])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("ss not available, falling back to lsof");
                return Ok(None);
            }
            Err(e) => return Err(Error::CommandFailed(format!("Failed to run ss: {}", e))),
        };

        if !output.status.success() {
            return Err(Error::CommandFailed(format!(
                "ss failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|e| Error::ParseError(format!("Invalid UTF-8 in ss output: {}", e)))?;

        Ok(Some(parse::parse_ss_listeners(&stdout, port)))
    }

    /// Query `lsof` for listeners on `port`.
    ///
    /// Executes: `lsof -nP -t -iTCP:<port> -sTCP:LISTEN`
    async fn lookup_with_lsof(&self, port: u16) -> Result<Vec<u32>> {
        let output = Command::new("lsof")
            .args(["-nP", "-t", &format!("-iTCP:{}", port), "-sTCP:LISTEN"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| Error::CommandFailed(format!("Failed to run lsof: {}", e)))?;

        // lsof exits with 1 and prints nothing when no process matches
        if !output.status.success() {
            if output.status.code() == Some(1) && output.stdout.is_empty() {
                return Ok(Vec::new());
            }
            return Err(Error::CommandFailed(format!(
                "lsof failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|e| Error::ParseError(format!("Invalid UTF-8 in lsof output: {}", e)))?;

        Ok(parse::parse_pid_lines(&stdout))
    }
}

impl PlatformControl for UnixController {
    async fn terminate(&self, pid: ProcessId, mode: TerminationMode) -> Result<()> {
        let signal = Self::signal_for(mode);

        // Children are reparented once the root exits, so capture the tree first.
        let descendants = match self.descendants(pid).await {
            Ok(descendants) => descendants,
            Err(e) => {
                warn!(pid = pid.as_u32(), error = %e, "Could not enumerate process tree");
                Vec::new()
            }
        };

        Self::signal_root(pid, signal)?;
        Self::signal_group(pid, signal);

        for child in descendants {
            let Ok(child_pid) = ProcessId::try_from(child) else {
                continue;
            };
            match kill(Pid::from_raw(child_pid.as_i32()), signal) {
                Ok(()) => debug!(pid = child, signal = %signal, "Signalled descendant"),
                Err(Errno::ESRCH) => {}
                Err(errno) => debug!(pid = child, error = %errno, "Failed to signal descendant"),
            }
        }

        debug!(pid = pid.as_u32(), mode = %mode, "Termination requested");
        Ok(())
    }

    async fn lookup_port(&self, port: u16) -> Result<PortLookup> {
        if cfg!(target_os = "linux") {
            if let Some(listeners) = self.lookup_with_ss(port).await? {
                return listeners.into_lookup(port);
            }
        }

        let pids = self.lookup_with_lsof(port).await?;
        let pids = pids.into_iter().filter_map(|pid| ProcessId::try_from(pid).ok());
        Ok(PortLookup::first_of(port, pids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A pid far above any default `pid_max`.
    const FAKE_PID: i64 = 999_999_999;

    #[test]
    fn test_signal_for_mode() {
        assert_eq!(UnixController::signal_for(TerminationMode::Graceful), Signal::SIGTERM);
        assert_eq!(UnixController::signal_for(TerminationMode::Forced), Signal::SIGKILL);
    }

    #[tokio::test]
    async fn test_terminate_nonexistent_process() {
        let controller = UnixController::new();
        let pid = ProcessId::new(FAKE_PID).unwrap();

        let graceful = controller.terminate(pid, TerminationMode::Graceful).await;
        let forced = controller.terminate(pid, TerminationMode::Forced).await;

        assert!(matches!(graceful, Err(Error::ProcessNotFound(p)) if p == pid.as_u32()));
        assert!(matches!(forced, Err(Error::ProcessNotFound(p)) if p == pid.as_u32()));
    }

    fn spawn_sleeper() -> std::process::Child {
        std::process::Command::new("sleep").arg("30").spawn().unwrap()
    }

    #[tokio::test]
    async fn test_terminate_uses_mode_signal() {
        use std::os::unix::process::ExitStatusExt;

        let controller = UnixController::new();

        for (mode, signal) in [
            (TerminationMode::Graceful, Signal::SIGTERM),
            (TerminationMode::Forced, Signal::SIGKILL),
        ] {
            let mut child = spawn_sleeper();
            let pid = ProcessId::try_from(child.id()).unwrap();

            controller.terminate(pid, mode).await.unwrap();

            let status = child.wait().unwrap();
            assert_eq!(status.signal(), Some(signal as i32));
        }
    }

    #[tokio::test]
    async fn test_terminate_reaches_descendants() {
        let controller = UnixController::new();
        let mut shell = std::process::Command::new("sh")
            .args(["-c", "sleep 30 & sleep 30 & wait"])
            .spawn()
            .unwrap();
        let pid = ProcessId::try_from(shell.id()).unwrap();

        // Wait for the shell to fork both children.
        let mut children = Vec::new();
        for _ in 0..100 {
            match controller.descendants(pid).await {
                Ok(found) if found.len() >= 2 => {
                    children = found;
                    break;
                }
                Ok(_) => tokio::time::sleep(std::time::Duration::from_millis(20)).await,
                // Without ps the tree cannot be enumerated at all.
                Err(_) => {
                    let _ = shell.kill();
                    let _ = shell.wait();
                    return;
                }
            }
        }
        assert!(children.len() >= 2, "shell never forked its children: {:?}", children);

        controller.terminate(pid, TerminationMode::Forced).await.unwrap();
        shell.wait().unwrap();

        // Reaped, or a zombie under init: either way no longer running.
        let settled = crate::poller::probe_fn(move || {
            let children = children.clone();
            async move { children.iter().all(|&child| !is_running(child)) }
        });
        let options = crate::poller::PollOptions::new(
            std::time::Duration::from_millis(20),
            std::time::Duration::from_secs(5),
        );
        assert!(crate::poller::wait_until(&settled, &options).await);
    }

    fn is_running(pid: u32) -> bool {
        match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
            Ok(stat) => {
                let state = stat.rsplit(')').next().and_then(|rest| rest.split_whitespace().next());
                state != Some("Z")
            }
            // Without procfs fall back to a null signal, which also succeeds for zombies.
            Err(_) if cfg!(target_os = "linux") => false,
            Err(_) => kill(Pid::from_raw(pid as i32), None).is_ok(),
        }
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_terminate_foreign_process_is_denied() {
        use std::os::unix::fs::MetadataExt;

        // Only meaningful when pid 1 belongs to another user and we are not root.
        let Ok(meta) = std::fs::metadata("/proc/1") else {
            return;
        };
        let euid = nix::unistd::geteuid();
        if euid.is_root() || meta.uid() == euid.as_raw() {
            return;
        }

        let controller = UnixController::new();
        let init = ProcessId::new(1).unwrap();
        let result = controller.terminate(init, TerminationMode::Graceful).await;
        assert!(matches!(result, Err(Error::PermissionDenied(1))));
    }

    #[tokio::test]
    async fn test_descendants_of_current_process_excludes_self() {
        let controller = UnixController::new();
        let me = ProcessId::current();

        // ps may be missing in minimal containers; only check when it ran.
        if let Ok(descendants) = controller.descendants(me).await {
            assert!(!descendants.contains(&me.as_u32()));
        }
    }
}
