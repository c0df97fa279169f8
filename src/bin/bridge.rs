//! GenesisPresence.Bridge - Presence host process
//!
//! Stands in for the desktop shell's web-message handler:
//! - Loads presence.json (or defaults)
//! - Starts the presence client with the configured identity
//! - Reads host messages from stdin, one per line (`discord:<state>|<details>`)
//! - Shuts the client down on EOF or a `shutdown` line

use anyhow::{Context, Result};
use genesis_presence::config;
use genesis_presence::{HostBridge, PresenceClient};
use std::io::{self, BufRead};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();

    tracing::info!("GenesisPresence.Bridge starting...");

    let presence_config = config::load_config();
    let client = PresenceClient::from_config(&presence_config);

    // A no-op when `enabled` is false in presence.json.
    client.initialize(presence_config.client_id.clone());

    let bridge = HostBridge::new(&client, &presence_config);

    for line in io::stdin().lock().lines() {
        let line = line.context("Failed to read host message")?;
        let message = line.trim_end_matches('\r');

        if message == "shutdown" {
            break;
        }
        if !message.is_empty() {
            bridge.dispatch(message);
        }
    }

    // Same teardown as the window-destroy path; a second call is a no-op.
    client.shutdown();
    tracing::info!("GenesisPresence.Bridge exiting");
    Ok(())
}
