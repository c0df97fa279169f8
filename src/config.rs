/// Configuration module for the presence client.
///
/// This module provides:
/// - The values the desktop shell hands to the presence client at startup
///   (client id, image key, large text, link buttons, timing)
/// - Loading and saving them as JSON
/// - Determining the platform-specific data directory
///
/// The configuration lives in a `presence.json` file in the application data
/// directory (%APPDATA%/GenesisEngine/ on Windows). A missing or malformed
/// file yields the defaults.
///
/// # Example
///
/// ```rust,no_run
/// use genesis_presence::config::{load_config, save_config};
///
/// let mut config = load_config();
/// config.large_text = "Genesis Engine".to_string();
/// save_config(&config).expect("Failed to save config");
/// ```
use crate::activity::ActivityButton;
use crate::worker::WorkerTiming;
use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name of the presence configuration
pub const CONFIG_FILE: &str = "presence.json";

/// Presence settings supplied by the shell
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct PresenceConfig {
    /// Whether presence reporting is turned on at all
    pub enabled: bool,
    /// Application identity sent in the handshake
    pub client_id: String,
    /// Asset key of the large image
    pub large_image_key: String,
    /// Hover text of the large image
    pub large_text: String,
    /// Promotional link buttons attached to every activity
    pub buttons: Vec<ActivityButton>,
    pub poll_interval_ms: u64,
    pub retry_interval_ms: u64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        PresenceConfig {
            enabled: true,
            client_id: "1353177735031423028".to_string(),
            large_image_key: "fnf_icon".to_string(),
            large_text: "Genesis Engine".to_string(),
            buttons: vec![
                ActivityButton::new(
                    "View Project",
                    "https://github.com/IamBritex/FNF-Genesis-Engine",
                ),
                ActivityButton::new("Join the Discord", "https://discord.gg/tuinvitelink"),
            ],
            poll_interval_ms: 500,
            retry_interval_ms: 2000,
        }
    }
}

impl PresenceConfig {
    /// Worker timing derived from the configured intervals
    pub fn timing(&self) -> WorkerTiming {
        WorkerTiming {
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
            retry_interval: Duration::from_millis(self.retry_interval_ms.max(1)),
        }
    }
}

/// Get the application's data directory
/// Returns %APPDATA%/GenesisEngine/ on Windows
/// Creates directory if it doesn't exist
pub fn get_data_directory() -> Result<PathBuf> {
    let project_dirs = ProjectDirs::from("", "", "GenesisEngine")
        .ok_or_else(|| anyhow!("Failed to determine user data directory"))?;

    let data_dir = project_dirs.data_dir();

    fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

    Ok(data_dir.to_path_buf())
}

/// Load configuration from an explicit path
/// Returns default config if file doesn't exist or can't be parsed
pub fn load_config_from(path: &Path) -> PresenceConfig {
    let Ok(contents) = fs::read_to_string(path) else {
        return PresenceConfig::default();
    };

    match serde_json::from_str(&contents) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Ignoring malformed {}: {}", path.display(), e);
            PresenceConfig::default()
        }
    }
}

/// Load configuration from presence.json in the data directory
pub fn load_config() -> PresenceConfig {
    match get_data_directory() {
        Ok(data_dir) => load_config_from(&data_dir.join(CONFIG_FILE)),
        Err(_) => PresenceConfig::default(),
    }
}

/// Save configuration to an explicit path
pub fn save_config_to(path: &Path, config: &PresenceConfig) -> Result<()> {
    let json = serde_json::to_string_pretty(config).context("Failed to serialize config")?;

    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(())
}

/// Save configuration to presence.json in the data directory
pub fn save_config(config: &PresenceConfig) -> Result<()> {
    let data_dir = get_data_directory()?;
    save_config_to(&data_dir.join(CONFIG_FILE), config)
}
