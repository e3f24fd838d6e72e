//! Parsers for platform tool output.
//!
//! Compiled on every platform so the Windows and Unix formats are both
//! covered by the unit tests wherever they run.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::OnceLock;

use regex::Regex;

use crate::domain::{PortLookup, ProcessId};
use crate::error::{Error, Result};

/// Parse an address:port string.
///
/// Handles multiple address formats:
/// - IPv4: "127.0.0.1:3000" or "*:8080" or "0.0.0.0:135"
/// - IPv6: "\[::1]:3000" or "\[fe80::1]:8080"
/// - Scoped: "127.0.0.1%lo:53"
pub fn parse_address(address: &str) -> Option<(String, u16)> {
    if address.starts_with('[') {
        // IPv6 format: [::1]:3000
        let bracket_end = address.find(']')?;
        if bracket_end + 1 >= address.len() || address.as_bytes()[bracket_end + 1] != b':' {
            return None;
        }
        let addr = &address[..=bracket_end];
        let port: u16 = address[bracket_end + 2..].parse().ok()?;
        Some((addr.to_string(), port))
    } else {
        let last_colon = address.rfind(':')?;
        let addr = &address[..last_colon];
        let port: u16 = address[last_colon + 1..].parse().ok()?;
        let addr = if addr.is_empty() || addr == "0.0.0.0" { "*" } else { addr };
        Some((addr.to_string(), port))
    }
}

#[cfg_attr(windows, allow(dead_code))]
fn ss_users_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r#""[^"]*",pid=(\d+),fd=\d+"#).expect("ss users pattern"))
}

/// Listeners on one port as reported by `ss`.
#[cfg_attr(windows, allow(dead_code))]
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SsListeners {
    /// Owning pids in the order `ss` printed them, without duplicates.
    pub pids: Vec<u32>,
    /// A matching `LISTEN` row carried no owner. Without root, `ss` hides
    /// the owners of sockets that belong to other users.
    pub owner_hidden: bool,
}

#[cfg_attr(windows, allow(dead_code))]
impl SsListeners {
    /// Resolve to a lookup result.
    ///
    /// A listener whose owner cannot be seen is an error, never `NotFound`.
    pub fn into_lookup(self, port: u16) -> Result<PortLookup> {
        if self.pids.is_empty() && self.owner_hidden {
            return Err(Error::OwnerNotVisible(port));
        }
        let pids = self.pids.into_iter().filter_map(|pid| ProcessId::try_from(pid).ok());
        Ok(PortLookup::first_of(port, pids))
    }
}

/// Extract listeners for `port` from `ss -Htlnp` output.
///
/// Example lines:
/// ```text
/// LISTEN 0      511          0.0.0.0:3000      0.0.0.0:*    users:(("node",pid=4121,fd=19))
/// LISTEN 0      128          0.0.0.0:5432      0.0.0.0:*
/// ```
/// A socket shared by several processes lists all of them.
#[cfg_attr(windows, allow(dead_code))]
pub fn parse_ss_listeners(output: &str, port: u16) -> SsListeners {
    let mut listeners = SsListeners::default();
    let mut seen: HashSet<u32> = HashSet::new();

    for line in output.lines() {
        let components: Vec<&str> = line.split_whitespace().collect();
        if components.len() < 5 || components[0] != "LISTEN" {
            continue;
        }

        match parse_address(components[3]) {
            Some((_, p)) if p == port => {}
            _ => continue,
        }

        let users = components[5..].join(" ");
        let mut owners = 0;
        for caps in ss_users_regex().captures_iter(&users) {
            let Ok(pid) = caps[1].parse::<u32>() else {
                continue;
            };
            owners += 1;
            if seen.insert(pid) {
                listeners.pids.push(pid);
            }
        }

        if owners == 0 {
            listeners.owner_hidden = true;
        }
    }

    listeners
}

/// Parse terse `lsof -t` output: one pid per line.
pub fn parse_pid_lines(output: &str) -> Vec<u32> {
    let mut seen: HashSet<u32> = HashSet::new();
    output
        .lines()
        .filter_map(|line| line.trim().parse::<u32>().ok())
        .filter(|pid| seen.insert(*pid))
        .collect()
}

/// Parse `ps -A -o pid=,ppid=` output into `(pid, ppid)` pairs.
#[cfg_attr(windows, allow(dead_code))]
pub fn parse_ps_table(output: &str) -> Vec<(u32, u32)> {
    output
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let pid = parts.next()?.parse().ok()?;
            let ppid = parts.next()?.parse().ok()?;
            Some((pid, ppid))
        })
        .collect()
}

/// All transitive children of `root`, breadth first.
///
/// `root` itself is never included, even if the table contains a cycle.
#[cfg_attr(windows, allow(dead_code))]
pub fn descendants(root: u32, table: &[(u32, u32)]) -> Vec<u32> {
    let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
    for &(pid, ppid) in table {
        if pid != ppid {
            children.entry(ppid).or_default().push(pid);
        }
    }

    let mut result = Vec::new();
    let mut visited: HashSet<u32> = HashSet::from([root]);
    let mut queue = VecDeque::from([root]);

    while let Some(parent) = queue.pop_front() {
        for &child in children.get(&parent).map(Vec::as_slice).unwrap_or_default() {
            if visited.insert(child) {
                result.push(child);
                queue.push_back(child);
            }
        }
    }

    result
}

/// Extract listener pids for `port` from `netstat -ano` output.
///
/// Example output:
/// ```text
/// Active Connections
///
///   Proto  Local Address          Foreign Address        State           PID
///   TCP    0.0.0.0:135            0.0.0.0:0              LISTENING       1020
///   TCP    [::]:445               [::]:0                 LISTENING       4
///   TCP    127.0.0.1:3000         0.0.0.0:0              LISTENING       5432
///   UDP    0.0.0.0:5353           *:*                                    2200
/// ```
/// The state column is localized, so a listener is recognised by its
/// foreign address having port 0 instead.
#[cfg_attr(unix, allow(dead_code))]
pub fn parse_netstat_listeners(output: &str, port: u16) -> Vec<u32> {
    let mut pids = Vec::new();
    let mut seen: HashSet<u32> = HashSet::new();

    for line in output.lines() {
        let line = line.trim();
        if !line.starts_with("TCP") {
            continue;
        }

        // Expected format: TCP, Local Address, Foreign Address, State, PID
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 5 {
            continue;
        }

        match parse_address(parts[2]) {
            Some((_, 0)) => {}
            _ => continue,
        }

        match parse_address(parts[1]) {
            Some((_, p)) if p == port => {}
            _ => continue,
        }

        let Ok(pid) = parts[parts.len() - 1].parse::<u32>() else {
            continue;
        };
        if seen.insert(pid) {
            pids.push(pid);
        }
    }

    pids
}

/// Map a failed `taskkill` run to an error.
///
/// `combined` is stdout and stderr joined; taskkill reports most failures on
/// stdout with an `ERROR:` prefix.
#[cfg_attr(unix, allow(dead_code))]
pub fn classify_taskkill_failure(pid: u32, combined: &str) -> Error {
    let lower = combined.to_lowercase();

    if lower.contains("not found") || lower.contains("could not be found") {
        return Error::ProcessNotFound(pid);
    }

    if lower.contains("access is denied") || lower.contains("access denied") {
        return Error::PermissionDenied(pid);
    }

    Error::KillFailed {
        pid,
        reason: combined.trim().to_string(),
    }
}
