//! Teardown CLI - stop test instances and confirm their ports are released
//!
//! A command-line front end over teardown-core: look up port owners,
//! terminate process trees, and wait for ports to close or addresses to
//! become healthy.

mod commands;

use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use teardown_core::{ConfigStore, PollOptions, TeardownConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "teardown")]
#[command(author, version, about = "Stop test instances and confirm their ports are released")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the PID listening on a port
    Lookup {
        /// Port number to look up
        port: u16,
    },

    /// Terminate a process and its descendants
    Kill {
        /// Process ID of the tree root
        #[arg(allow_negative_numbers = true)]
        pid: i64,

        /// Force kill (SIGKILL / taskkill /F) without graceful shutdown
        #[arg(short, long)]
        force: bool,
    },

    /// Terminate the listener on a port and wait until the port is closed
    Stop {
        /// Port number to free
        port: u16,

        /// Force kill (SIGKILL / taskkill /F) without graceful shutdown
        #[arg(short, long)]
        force: bool,

        #[command(flatten)]
        timing: TimingArgs,
    },

    /// Wait until every given port refuses connections
    WaitClosed {
        /// Ports that must all be closed at once
        #[arg(required = true)]
        ports: Vec<u16>,

        #[command(flatten)]
        timing: TimingArgs,
    },

    /// Wait until an address accepts TCP connections
    WaitHealthy {
        /// Address to probe, e.g. 127.0.0.1:8080
        address: String,

        #[command(flatten)]
        timing: TimingArgs,
    },

    /// Hold a TCP port open until terminated (test fixture)
    Listen {
        /// Port number to bind
        port: u16,
    },

    /// Show current configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        init: bool,
    },
}

/// Per-invocation overrides of the configured polling timings.
#[derive(Args)]
struct TimingArgs {
    /// Give up after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Pause between checks, in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,
}

impl TimingArgs {
    fn poll_options(&self, config: &TeardownConfig) -> PollOptions {
        let defaults = config.poll_options();
        PollOptions::new(
            self.interval_ms.map(Duration::from_millis).unwrap_or(defaults.interval),
            self.timeout_ms.map(Duration::from_millis).unwrap_or(defaults.timeout),
        )
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "teardown=debug,teardown_core=debug"
    } else {
        "teardown=info,teardown_core=info"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let store = ConfigStore::new()?;
    let config = store
        .load()
        .await
        .with_context(|| format!("failed to load {}", store.path().display()))?;

    match cli.command {
        Commands::Lookup { port } => {
            if !commands::lookup::run(port, cli.json).await? {
                std::process::exit(1);
            }
        }
        Commands::Kill { pid, force } => {
            commands::kill::run(pid, force).await?;
        }
        Commands::Stop {
            port,
            force,
            timing,
        } => {
            let options = timing.poll_options(&config);
            commands::stop::run(port, force, options, &config, cli.json).await?;
        }
        Commands::WaitClosed { ports, timing } => {
            let options = timing.poll_options(&config);
            commands::wait::closed(&ports, options, &config).await?;
        }
        Commands::WaitHealthy { address, timing } => {
            let options = timing.poll_options(&config);
            commands::wait::healthy(&address, options, &config).await?;
        }
        Commands::Listen { port } => {
            commands::listen::run(&config.host, port).await?;
        }
        Commands::Config { init } => {
            commands::config::show(&store, &config, init, cli.json).await?;
        }
    }

    Ok(())
}
