//! Presence descriptors and their JSON payloads
//!
//! Payloads are built from typed structs and serialized with `serde_json`, so
//! every string field is fully JSON-escaped (quotes, backslashes and control
//! characters alike).

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Wall-clock seconds and monotonic instant captured on first use
struct ProcessClock {
    started_at: i64,
    instant: Instant,
}

static PROCESS_CLOCK: Lazy<ProcessClock> = Lazy::new(|| ProcessClock {
    started_at: SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0),
    instant: Instant::now(),
});

static LAST_NONCE: AtomicU64 = AtomicU64::new(0);

/// Unix timestamp (seconds) of process start, fixed for the process lifetime
pub fn process_start_timestamp() -> i64 {
    PROCESS_CLOCK.started_at
}

/// Milliseconds since process start, bumped so that every call returns a
/// strictly larger value than the previous one
pub fn next_nonce() -> u64 {
    let now = PROCESS_CLOCK.instant.elapsed().as_millis() as u64;
    let previous = LAST_NONCE
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
            Some(now.max(last + 1))
        })
        .unwrap_or(0);
    now.max(previous + 1)
}

/// A link button shown under the activity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityButton {
    pub label: String,
    pub url: String,
}

impl ActivityButton {
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
        }
    }
}

/// One presence update. Replaced wholesale, never edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceDescriptor {
    pub details: String,
    pub state: String,
    pub large_image_key: String,
    pub large_text: String,
    pub start_timestamp: i64,
    pub process_id: u32,
}

impl PresenceDescriptor {
    /// Descriptor stamped with this process's id and start time
    pub fn new(
        details: impl Into<String>,
        state: impl Into<String>,
        large_image_key: impl Into<String>,
        large_text: impl Into<String>,
    ) -> Self {
        Self {
            details: details.into(),
            state: state.into(),
            large_image_key: large_image_key.into(),
            large_text: large_text.into(),
            start_timestamp: process_start_timestamp(),
            process_id: std::process::id(),
        }
    }

    /// Serialize as a `SET_ACTIVITY` command
    pub fn to_command_json(
        &self,
        buttons: &[ActivityButton],
        nonce: u64,
    ) -> Result<String, serde_json::Error> {
        let command = SetActivityCommand {
            cmd: "SET_ACTIVITY",
            args: SetActivityArgs {
                pid: self.process_id,
                activity: Activity {
                    details: &self.details,
                    state: &self.state,
                    assets: Assets {
                        large_image: &self.large_image_key,
                        large_text: &self.large_text,
                    },
                    timestamps: Timestamps {
                        start: self.start_timestamp,
                    },
                    buttons,
                },
            },
            nonce: nonce.to_string(),
        };
        serde_json::to_string(&command)
    }
}

/// Handshake sent as the first frame of every connection
#[derive(Debug, Serialize)]
pub(crate) struct Handshake<'a> {
    pub v: u32,
    pub client_id: &'a str,
}

impl<'a> Handshake<'a> {
    pub fn new(client_id: &'a str) -> Self {
        Self { v: 1, client_id }
    }
}

#[derive(Serialize)]
struct SetActivityCommand<'a> {
    cmd: &'static str,
    args: SetActivityArgs<'a>,
    nonce: String,
}

#[derive(Serialize)]
struct SetActivityArgs<'a> {
    pid: u32,
    activity: Activity<'a>,
}

#[derive(Serialize)]
struct Activity<'a> {
    details: &'a str,
    state: &'a str,
    assets: Assets<'a>,
    timestamps: Timestamps,
    buttons: &'a [ActivityButton],
}

#[derive(Serialize)]
struct Assets<'a> {
    large_image: &'a str,
    large_text: &'a str,
}

#[derive(Serialize)]
struct Timestamps {
    start: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn buttons() -> Vec<ActivityButton> {
        vec![
            ActivityButton::new("View Project", "https://example.com/project"),
            ActivityButton::new("Join", "https://example.com/join"),
        ]
    }

    #[test]
    fn test_command_shape() {
        let descriptor = PresenceDescriptor::new("Playing", "Week 1", "fnf_icon", "Genesis Engine");
        let json = descriptor.to_command_json(&buttons(), 77).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["cmd"], "SET_ACTIVITY");
        assert_eq!(value["nonce"], "77");
        assert_eq!(value["args"]["pid"], std::process::id());

        let activity = &value["args"]["activity"];
        assert_eq!(activity["details"], "Playing");
        assert_eq!(activity["state"], "Week 1");
        assert_eq!(activity["assets"]["large_image"], "fnf_icon");
        assert_eq!(activity["assets"]["large_text"], "Genesis Engine");
        assert_eq!(activity["timestamps"]["start"], process_start_timestamp());
        assert_eq!(activity["buttons"].as_array().unwrap().len(), 2);
        assert_eq!(activity["buttons"][1]["url"], "https://example.com/join");
    }

    #[test]
    fn test_field_order_matches_wire_format() {
        let descriptor = PresenceDescriptor::new("d", "s", "k", "t");
        let json = descriptor.to_command_json(&[], 1).unwrap();
        assert!(json.starts_with(r#"{"cmd":"SET_ACTIVITY","args":{"pid":"#));
        assert!(json.contains(r#""activity":{"details":"d","state":"s","assets":{"large_image":"k","large_text":"t"},"timestamps":{"start":"#));
        assert!(json.ends_with(r#""nonce":"1"}"#));
    }

    #[test]
    fn test_quotes_and_backslashes_escaped() {
        let descriptor = PresenceDescriptor::new("a\"b\\c", "line\nbreak", "k", "t");
        let json = descriptor.to_command_json(&[], 1).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["args"]["activity"]["details"], "a\"b\\c");
        assert_eq!(value["args"]["activity"]["state"], "line\nbreak");
    }

    #[test]
    fn test_handshake_json() {
        let json = serde_json::to_string(&Handshake::new("1353177735031423028")).unwrap();
        assert_eq!(json, r#"{"v":1,"client_id":"1353177735031423028"}"#);
    }

    #[test]
    fn test_start_timestamp_is_fixed() {
        let first = PresenceDescriptor::new("a", "b", "c", "d");
        let second = PresenceDescriptor::new("e", "f", "g", "h");
        assert_eq!(first.start_timestamp, second.start_timestamp);
        assert!(first.start_timestamp > 0);
    }

    #[test]
    fn test_nonce_strictly_increases() {
        let mut last = next_nonce();
        for _ in 0..1000 {
            let next = next_nonce();
            assert!(next > last);
            last = next;
        }
    }
}
