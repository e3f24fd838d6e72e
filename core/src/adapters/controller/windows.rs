//! Windows process controller implementation
//!
//! Uses the following system commands:
//! - `taskkill /PID xxx /T` for graceful termination of the process tree
//! - `taskkill /PID xxx /T /F` for forced termination of the process tree
//! - `Get-NetTCPConnection -State Listen` (IPv4 and IPv6) to find the owner of
//!   a listening port, falling back to `netstat -ano` without PowerShell

use std::io::ErrorKind;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::domain::{PortLookup, ProcessId, TerminationMode};
use crate::error::{Error, Result};

use super::parse;
use super::PlatformControl;

/// Windows process controller.
///
/// `/T` is passed in both modes so child processes are always included.
#[derive(Debug, Default)]
pub struct WindowsController;

impl WindowsController {
    /// Create a new WindowsController instance
    pub fn new() -> Self {
        Self
    }

    fn taskkill_args(pid: ProcessId, mode: TerminationMode) -> Vec<String> {
        let mut args = vec!["/PID".to_string(), pid.to_string()];
        if mode.is_forced() {
            args.push("/F".to_string());
        }
        args.push("/T".to_string());
        args
    }

    fn listen_query(port: u16) -> String {
        format!(
            "Get-NetTCPConnection -LocalPort {} -State Listen -ErrorAction SilentlyContinue \
             | Select-Object -ExpandProperty OwningProcess",
            port
        )
    }

    /// Ask PowerShell for the owners of listeners on `port`.
    ///
    /// Returns `Ok(None)` when PowerShell is not installed so the caller can fall back.
    async fn lookup_with_powershell(port: u16) -> Result<Option<Vec<u32>>> {
        let output = match Command::new("powershell")
            .args(["-NoProfile", "-NonInteractive", "-Command", &Self::listen_query(port)])
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("powershell not available, falling back to netstat");
                return Ok(None);
            }
            Err(e) => return Err(Error::CommandFailed(format!("Failed to run powershell: {}", e))),
        };

        if !output.status.success() {
            return Err(Error::CommandFailed(format!(
                "Get-NetTCPConnection failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(Some(parse::parse_pid_lines(&String::from_utf8_lossy(&output.stdout))))
    }

    /// Query `netstat` for listeners on `port`, both address families.
    async fn lookup_with_netstat(port: u16) -> Result<Vec<u32>> {
        let output = Command::new("netstat")
            .args(["-ano"])
            .output()
            .await
            .map_err(|e| Error::CommandFailed(format!("netstat -ano: {}", e)))?;

        if !output.status.success() {
            return Err(Error::CommandFailed(format!(
                "netstat -ano failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        Ok(parse::parse_netstat_listeners(&String::from_utf8_lossy(&output.stdout), port))
    }
}

impl PlatformControl for WindowsController {
    async fn terminate(&self, pid: ProcessId, mode: TerminationMode) -> Result<()> {
        let args = Self::taskkill_args(pid, mode);
        debug!(pid = pid.as_u32(), mode = %mode, "Executing taskkill");

        let output = Command::new("taskkill")
            .args(&args)
            .output()
            .await
            .map_err(|e| Error::CommandFailed(format!("Failed to run taskkill: {}", e)))?;

        if output.status.success() {
            debug!(pid = pid.as_u32(), mode = %mode, "taskkill succeeded");
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let combined = format!("{} {}", stdout, stderr);

        let err = parse::classify_taskkill_failure(pid.as_u32(), &combined);
        warn!(pid = pid.as_u32(), error = %err, "taskkill failed");
        Err(err)
    }

    async fn lookup_port(&self, port: u16) -> Result<PortLookup> {
        let pids = match Self::lookup_with_powershell(port).await? {
            Some(pids) => pids,
            None => Self::lookup_with_netstat(port).await?,
        };

        let pids = pids
            .into_iter()
            // PID 0 is the idle process placeholder, never a real owner
            .filter_map(|pid| ProcessId::try_from(pid).ok());
        Ok(PortLookup::first_of(port, pids))
    }
}
