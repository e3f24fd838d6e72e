//! Configuration for polling and connection timings.
//!
//! Stored in JSON format at `~/.teardown/config.json`, or at the path named by
//! the `TEARDOWN_CONFIG` environment variable. A missing file means defaults.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};
use crate::poller::PollOptions;

/// Environment variable overriding the configuration file location.
pub const CONFIG_PATH_ENV: &str = "TEARDOWN_CONFIG";

/// Timing configuration shared by the CLI and test harnesses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeardownConfig {
    /// Pause between probe evaluations, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Bound on an ordinary wait, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Bound on slow waits such as registry removal, in milliseconds.
    #[serde(default = "default_long_timeout_ms")]
    pub long_timeout_ms: u64,

    /// Bound on each TCP connect made by a probe, in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Host the port probes connect to.
    #[serde(default = "default_host")]
    pub host: String,
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_long_timeout_ms() -> u64 {
    60_000
}

fn default_connect_timeout_ms() -> u64 {
    500
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

impl Default for TeardownConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            timeout_ms: default_timeout_ms(),
            long_timeout_ms: default_long_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            host: default_host(),
        }
    }
}

impl TeardownConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn long_timeout(&self) -> Duration {
        Duration::from_millis(self.long_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Poll options for an ordinary wait.
    pub fn poll_options(&self) -> PollOptions {
        PollOptions::new(self.poll_interval(), self.timeout())
    }

    /// Poll options for a slow wait.
    pub fn long_poll_options(&self) -> PollOptions {
        PollOptions::new(self.poll_interval(), self.long_timeout())
    }

    fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(Error::Config("pollIntervalMs must be greater than 0".to_string()));
        }
        if self.connect_timeout_ms == 0 {
            return Err(Error::Config("connectTimeoutMs must be greater than 0".to_string()));
        }
        if self.host.trim().is_empty() {
            return Err(Error::Config("host must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Configuration store.
///
/// Handles reading and writing configuration to `~/.teardown/config.json`.
pub struct ConfigStore {
    /// Path to the configuration file.
    config_path: PathBuf,
}

impl ConfigStore {
    /// Create a new config store with the default path.
    ///
    /// `TEARDOWN_CONFIG` wins over `~/.teardown/config.json`.
    pub fn new() -> Result<Self> {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
            return Ok(Self::with_path(PathBuf::from(path)));
        }

        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;

        Ok(Self {
            config_path: home.join(".teardown").join("config.json"),
        })
    }

    /// Create a config store with a custom path (for testing).
    pub fn with_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// Path of the configuration file.
    pub fn path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Load configuration from disk.
    ///
    /// Returns default config if the file doesn't exist.
    pub async fn load(&self) -> Result<TeardownConfig> {
        if !self.config_path.exists() {
            return Ok(TeardownConfig::default());
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;

        let config: TeardownConfig = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub async fn save(&self, config: &TeardownConfig) -> Result<()> {
        config.validate()?;

        if let Some(config_dir) = self.config_path.parent() {
            fs::create_dir_all(config_dir)
                .await
                .map_err(|e| Error::Config(format!("Failed to create config directory: {}", e)))?;
        }

        let content = serde_json::to_string_pretty(config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        // Write atomically by writing to temp file then renaming
        let temp_path = self.config_path.with_extension("json.tmp");

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to create temp config file: {}", e)))?;

        file.write_all(content.as_bytes())
            .await
            .map_err(|e| Error::Config(format!("Failed to write config: {}", e)))?;

        file.sync_all()
            .await
            .map_err(|e| Error::Config(format!("Failed to sync config: {}", e)))?;

        fs::rename(&temp_path, &self.config_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to rename config file: {}", e)))?;

        Ok(())
    }
}
