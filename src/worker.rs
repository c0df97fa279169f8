//! Background worker driving the presence session
//!
//! One dedicated thread per client. Each pass of the loop either tries to
//! (re)connect or drains the pending slot onto the channel, then sleeps.
//! Sleeps are interruptible: shutdown drops the wake-up sender, which ends
//! the current sleep immediately.

use crate::connector::Connector;
use crate::publisher::PendingSlot;
use crate::session::Session;
use crossbeam::channel::{Receiver, RecvTimeoutError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Fixed timing of the worker loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerTiming {
    /// Pause between flushes while connected
    pub poll_interval: Duration,
    /// Back-off after a failed connection attempt
    pub retry_interval: Duration,
}

impl Default for WorkerTiming {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            retry_interval: Duration::from_secs(2),
        }
    }
}

pub(crate) struct Worker {
    session: Session,
    connector: Connector,
    slot: Arc<PendingSlot>,
    running: Arc<AtomicBool>,
    wake_rx: Receiver<()>,
    timing: WorkerTiming,
}

impl Worker {
    pub fn new(
        client_id: String,
        connector: Connector,
        slot: Arc<PendingSlot>,
        running: Arc<AtomicBool>,
        wake_rx: Receiver<()>,
        timing: WorkerTiming,
    ) -> Self {
        Self {
            session: Session::new(client_id),
            connector,
            slot,
            running,
            wake_rx,
            timing,
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Sleep for `duration` unless shutdown is requested first.
    /// Returns whether the worker should keep going.
    fn pause(&self, duration: Duration) -> bool {
        match self.wake_rx.recv_timeout(duration) {
            Err(RecvTimeoutError::Timeout) | Ok(()) => self.is_running(),
            Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    pub fn run(mut self) {
        info!("Presence worker started");

        while self.is_running() {
            if !self.session.is_ready() && !self.try_connect() {
                if !self.pause(self.timing.retry_interval) {
                    break;
                }
                continue;
            }

            self.flush();

            if !self.pause(self.timing.poll_interval) {
                break;
            }
        }

        self.session.disconnect();
        info!("Presence worker stopped");
    }

    fn try_connect(&mut self) -> bool {
        match self.session.establish(&self.connector, &self.running) {
            Ok(()) => {
                // A fresh session starts with no activity; replay the latest.
                if self.slot.rearm() {
                    debug!("Replaying last activity on new session");
                }
                true
            }
            Err(e) if e.is_no_service() => {
                debug!("{}", e);
                false
            }
            Err(e) if e.is_shutdown_race() => {
                debug!("Presence connect abandoned: {}", e);
                false
            }
            Err(e) => {
                warn!("Presence connection attempt failed: {}", e);
                false
            }
        }
    }

    /// Send the pending update, if any. The slot lock is released before the
    /// write starts.
    fn flush(&mut self) {
        let Some(update) = self.slot.take() else {
            return;
        };

        match self.session.send_payload(&update.payload) {
            Ok(()) => debug!(
                "Activity sent: {} / {}",
                update.descriptor.details, update.descriptor.state
            ),
            Err(e) => warn!("Failed to send activity, reconnecting: {}", e),
        }
    }
}
