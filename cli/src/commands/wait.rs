//! Wait commands - block until ports close or an address becomes healthy.

use anyhow::{bail, Result};
use teardown_core::{
    wait_for_address_healthy, wait_for_ports_closed, PollOptions, TcpHealthCheck, TeardownConfig,
};

pub async fn closed(ports: &[u16], options: PollOptions, config: &TeardownConfig) -> Result<()> {
    if ports.contains(&0) {
        bail!("port 0 is not a valid TCP port");
    }

    if !wait_for_ports_closed(&config.host, ports, config.connect_timeout(), &options).await {
        bail!(
            "ports {:?} on {} still open after {:?}",
            ports,
            config.host,
            options.timeout
        );
    }

    println!("Ports {:?} closed", ports);
    Ok(())
}

pub async fn healthy(address: &str, options: PollOptions, config: &TeardownConfig) -> Result<()> {
    let check = TcpHealthCheck::new(config.connect_timeout());

    if !wait_for_address_healthy(&check, address, &options).await {
        bail!("{} did not become healthy within {:?}", address, options.timeout);
    }

    println!("{} is healthy", address);
    Ok(())
}
