//! Genesis Presence Library
//!
//! Presence-reporting client embedded in the Genesis desktop shell
//!
//! Architecture:
//! - Shell / UI threads call `PresenceClient::set_activity` (never blocks)
//! - A dedicated worker thread owns the session with the local presence
//!   service and flushes the latest activity every poll interval
//! - Frames travel over a named pipe (Windows) or Unix socket

pub mod activity;
pub mod bridge;
pub mod client;
pub mod config;
pub mod connector;
pub mod error;
pub mod frame;
pub mod publisher;
pub mod session;
pub mod worker;

#[cfg(test)]
mod test_support;

pub use activity::{ActivityButton, PresenceDescriptor};
pub use bridge::{HostBridge, HostMessage};
pub use client::PresenceClient;
pub use config::PresenceConfig;
pub use connector::{Connector, LocalTransport, OpenChannel, Transport};
pub use error::{ConnectError, FrameError, PresenceError, SendError};
pub use frame::{Frame, Opcode};
pub use session::{Session, SessionStatus};
pub use worker::WorkerTiming;
