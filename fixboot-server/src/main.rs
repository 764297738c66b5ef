/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! `fixboot-server [PROPERTIES]`
//!
//! Assembles an acceptor from the TOML properties file (default
//! `fixboot.toml`, defaults when missing), runs it until Ctrl-C, then stops.

use anyhow::Context;
use fixboot_server::{ServerOverrides, ServerProperties, assemble, server_config_available};
use std::path::PathBuf;
use tracing::{info, warn};

const DEFAULT_PROPERTIES_FILE: &str = "fixboot.toml";

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_PROPERTIES_FILE), PathBuf::from);
    let properties = ServerProperties::load_or_default(&path)
        .with_context(|| format!("loading properties from {}", path.display()))?;

    if !server_config_available(&properties, None) {
        warn!("no session settings found, acceptor not assembled");
        return Ok(());
    }

    let server = assemble(&properties, ServerOverrides::new()).context("assembling acceptor")?;
    if !server.start_if_auto()? {
        info!("connector not started; exiting");
        return Ok(());
    }
    info!(endpoints = ?server.acceptor().endpoints(), "acceptor running, press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    info!("shutting down");
    server.shutdown().await;
    Ok(())
}
