//! Lookup command - show the process listening on a port.

use anyhow::{Context, Result};
use teardown_core::{PortLookup, ProcessController};

/// Returns whether a listener was found so `main` can pick the exit code.
pub async fn run(port: u16, json: bool) -> Result<bool> {
    let controller = ProcessController::new();
    let lookup = controller
        .lookup_port(port)
        .await
        .with_context(|| format!("failed to look up port {}", port))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&lookup)?);
        return Ok(lookup.is_found());
    }

    match lookup {
        PortLookup::Found(binding) => println!("{}", binding.pid),
        PortLookup::NotFound => eprintln!("No listener on port {}", port),
    }

    Ok(lookup.is_found())
}
