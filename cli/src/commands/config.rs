//! Config command - show or initialise the configuration file.

use anyhow::{Context, Result};
use teardown_core::{ConfigStore, TeardownConfig};

pub async fn show(store: &ConfigStore, config: &TeardownConfig, init: bool, json: bool) -> Result<()> {
    if init {
        store
            .save(config)
            .await
            .with_context(|| format!("failed to write {}", store.path().display()))?;
        eprintln!("Wrote {}", store.path().display());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
        return Ok(());
    }

    println!("Config file:      {}", store.path().display());
    println!("Poll interval:    {} ms", config.poll_interval_ms);
    println!("Timeout:          {} ms", config.timeout_ms);
    println!("Long timeout:     {} ms", config.long_timeout_ms);
    println!("Connect timeout:  {} ms", config.connect_timeout_ms);
    println!("Host:             {}", config.host);
    Ok(())
}
