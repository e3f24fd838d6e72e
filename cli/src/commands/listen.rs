//! Listen command - hold a port open until terminated.
//!
//! A stand-in service instance for end-to-end checks of the other commands.

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::debug;

pub async fn run(host: &str, port: u16) -> Result<()> {
    let listener = TcpListener::bind((host, port))
        .await
        .with_context(|| format!("failed to bind {}:{}", host, port))?;

    println!("Listening on {} (pid {})", listener.local_addr()?, std::process::id());

    loop {
        let (stream, peer) = listener.accept().await?;
        debug!(peer = %peer, "Accepted connection");
        drop(stream);
    }
}
