//! Error types for the presence client
//!
//! None of these ever reach the UI layer: the worker absorbs them and turns
//! them into session state transitions.

use std::io;
use thiserror::Error;

/// Errors produced by the frame codec
#[derive(Debug, Error)]
pub enum FrameError {
    /// Payload does not fit the signed 32-bit length field
    #[error("frame payload of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },

    /// Not enough bytes for the header or the announced payload
    #[error("truncated frame: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    /// Header announces a negative payload length
    #[error("invalid payload length {0}")]
    InvalidLength(i32),

    #[error("frame payload is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("frame I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// Errors produced while discovering a channel
#[derive(Debug, Error)]
pub enum ConnectError {
    /// No candidate address accepted a connection. Expected when the
    /// presence service is not running.
    #[error("no presence service listening on any of {attempted} channel addresses")]
    NoServiceListening { attempted: usize },

    /// Shutdown was requested while probing; any opened handle was released
    #[error("shutdown requested while connecting")]
    ShutdownWhileConnecting,
}

/// Errors produced while writing to an open channel
#[derive(Debug, Error)]
pub enum SendError {
    /// The channel was already closed or never opened
    #[error("channel is not open")]
    NotConnected,

    #[error("short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    #[error("channel write failed: {0}")]
    Failure(#[source] io::Error),

    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Umbrella error for session-level operations
#[derive(Debug, Error)]
pub enum PresenceError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Send(#[from] SendError),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl PresenceError {
    /// Whether this is the routine "service not running" condition
    pub fn is_no_service(&self) -> bool {
        matches!(
            self,
            PresenceError::Connect(ConnectError::NoServiceListening { .. })
        )
    }

    /// Connect abandoned because shutdown was requested mid-attempt
    pub fn is_shutdown_race(&self) -> bool {
        matches!(
            self,
            PresenceError::Connect(ConnectError::ShutdownWhileConnecting)
        )
    }
}
