//! Stop command - terminate whatever listens on a port and wait for release.

use anyhow::{Context, Result};
use teardown_core::{PollOptions, ProcessController, TeardownConfig, TeardownService, TerminationMode};

pub async fn run(port: u16, force: bool, options: PollOptions, config: &TeardownConfig, json: bool) -> Result<()> {
    let service = TeardownService::new(ProcessController::new(), config);
    let mode = TerminationMode::from_force(force);

    let report = service
        .stop_port(port, mode, &options)
        .await
        .with_context(|| format!("failed to stop the listener on port {}", port))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    match report.pid {
        Some(pid) => println!(
            "Stopped pid {} on port {} ({}), released after {} ms",
            pid, port, mode, report.elapsed_ms
        ),
        None => println!("Port {} has no listener", port),
    }
    Ok(())
}
