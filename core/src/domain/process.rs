//! Process identity and termination mode.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// ProcessId
// ============================================================================

/// A positive process identifier.
///
/// Construction rejects zero and negative values, and values that do not fit
/// the signed `pid_t` used by Unix signalling, so an invalid pid never reaches
/// a platform call. Holding a `ProcessId` says nothing about liveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct ProcessId(u32);

impl ProcessId {
    /// Validate a raw process identifier.
    pub fn new(raw: i64) -> Result<Self> {
        if raw <= 0 || raw > i64::from(i32::MAX) {
            return Err(Error::InvalidPid(raw));
        }
        Ok(Self(raw as u32))
    }

    /// The identifier as an unsigned integer.
    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// The identifier as a signed `pid_t`-compatible integer.
    pub fn as_i32(self) -> i32 {
        // Bounded by `new`.
        self.0 as i32
    }

    /// The identifier of the calling process.
    pub fn current() -> Self {
        Self(std::process::id())
    }
}

impl TryFrom<i64> for ProcessId {
    type Error = Error;

    fn try_from(raw: i64) -> Result<Self> {
        Self::new(raw)
    }
}

impl TryFrom<u32> for ProcessId {
    type Error = Error;

    fn try_from(raw: u32) -> Result<Self> {
        Self::new(i64::from(raw))
    }
}

impl From<ProcessId> for u32 {
    fn from(pid: ProcessId) -> Self {
        pid.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// TerminationMode
// ============================================================================

/// How a process tree should be asked to exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum TerminationMode {
    /// Cooperative shutdown (SIGTERM / plain taskkill).
    #[default]
    Graceful,
    /// Immediate shutdown (SIGKILL / taskkill /F).
    Forced,
}

impl TerminationMode {
    /// Pick the mode from a `--force` style flag.
    pub fn from_force(force: bool) -> Self {
        if force {
            TerminationMode::Forced
        } else {
            TerminationMode::Graceful
        }
    }

    pub fn is_forced(self) -> bool {
        matches!(self, TerminationMode::Forced)
    }
}

impl fmt::Display for TerminationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationMode::Graceful => write!(f, "graceful"),
            TerminationMode::Forced => write!(f, "forced"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_id_rejects_non_positive() {
        assert!(matches!(ProcessId::new(0), Err(Error::InvalidPid(0))));
        assert!(matches!(ProcessId::new(-1), Err(Error::InvalidPid(-1))));
        assert!(matches!(ProcessId::new(i64::MIN), Err(Error::InvalidPid(_))));
    }

    #[test]
    fn test_process_id_rejects_overflowing_pid_t() {
        let too_big = i64::from(i32::MAX) + 1;
        assert!(ProcessId::new(too_big).is_err());
        assert!(ProcessId::try_from(u32::MAX).is_err());
        assert_eq!(ProcessId::new(i64::from(i32::MAX)).unwrap().as_i32(), i32::MAX);
    }

    #[test]
    fn test_process_id_accessors() {
        let pid = ProcessId::new(4242).unwrap();
        assert_eq!(pid.as_u32(), 4242);
        assert_eq!(pid.as_i32(), 4242);
        assert_eq!(pid.to_string(), "4242");
        assert_eq!(u32::from(pid), 4242);
    }

    #[test]
    fn test_process_id_serde() {
        let pid: ProcessId = serde_json::from_str("31").unwrap();
        assert_eq!(pid.as_u32(), 31);
        assert_eq!(serde_json::to_string(&pid).unwrap(), "31");
        assert!(serde_json::from_str::<ProcessId>("0").is_err());
        assert!(serde_json::from_str::<ProcessId>("-7").is_err());
    }

    #[test]
    fn test_termination_mode() {
        assert_eq!(TerminationMode::from_force(true), TerminationMode::Forced);
        assert_eq!(TerminationMode::from_force(false), TerminationMode::Graceful);
        assert!(TerminationMode::Forced.is_forced());
        assert_eq!(TerminationMode::default(), TerminationMode::Graceful);
        assert_eq!(
            serde_json::to_string(&TerminationMode::Forced).unwrap(),
            "\"forced\""
        );
    }
}
