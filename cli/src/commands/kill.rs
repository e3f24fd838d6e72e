//! Kill command - terminate a process tree by PID.

use anyhow::{Context, Result};
use teardown_core::{ProcessController, ProcessId, TerminationMode};

pub async fn run(pid: i64, force: bool) -> Result<()> {
    let pid = ProcessId::new(pid)?;
    let mode = TerminationMode::from_force(force);

    ProcessController::new()
        .terminate(pid, mode)
        .await
        .with_context(|| format!("failed to terminate pid {} ({})", pid, mode))?;

    println!("Sent {} termination to process tree {}", mode, pid);
    Ok(())
}
