//! Host message bridge
//!
//! The embedded web page reports presence by posting plain string messages
//! to the native shell. Only the presence command is handled here:
//!
//! ```text
//! discord:<state>|<details>
//! ```
//!
//! Everything after the first `|` is the details line; without a `|` the
//! details are empty. Any other message belongs to another shell feature
//! and is ignored.

use crate::client::PresenceClient;
use crate::config::PresenceConfig;
use tracing::trace;

/// Prefix of the presence command
pub const PRESENCE_PREFIX: &str = "discord:";

/// A message posted by the web page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostMessage {
    SetActivity { state: String, details: String },
    /// A message for some other part of the shell
    Other(String),
}

impl HostMessage {
    pub fn parse(message: &str) -> Self {
        let Some(data) = message.strip_prefix(PRESENCE_PREFIX) else {
            return HostMessage::Other(message.to_string());
        };

        let (state, details) = data.split_once('|').unwrap_or((data, ""));
        HostMessage::SetActivity {
            state: state.to_string(),
            details: details.to_string(),
        }
    }
}

/// Forwards host messages to the presence client, filling in the image key
/// and large text from configuration
pub struct HostBridge<'a> {
    client: &'a PresenceClient,
    large_image_key: String,
    large_text: String,
}

impl<'a> HostBridge<'a> {
    pub fn new(client: &'a PresenceClient, config: &PresenceConfig) -> Self {
        Self {
            client,
            large_image_key: config.large_image_key.clone(),
            large_text: config.large_text.clone(),
        }
    }

    /// Handle one message. Returns true if it was a presence command.
    pub fn dispatch(&self, message: &str) -> bool {
        match HostMessage::parse(message) {
            HostMessage::SetActivity { state, details } => {
                self.client
                    .set_activity(&details, &state, &self.large_image_key, &self.large_text);
                true
            }
            HostMessage::Other(other) => {
                trace!("Ignoring host message: {}", other);
                false
            }
        }
    }
}
