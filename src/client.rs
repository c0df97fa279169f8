//! Presence client lifecycle
//!
//! [`PresenceClient`] is the only type collaborators need: construct it once,
//! call [`initialize`] at startup, [`set_activity`] whenever the UI changes,
//! and [`shutdown`] from whichever teardown path runs first. Every method is
//! fire-and-forget; failures are logged and absorbed.
//!
//! [`initialize`]: PresenceClient::initialize
//! [`set_activity`]: PresenceClient::set_activity
//! [`shutdown`]: PresenceClient::shutdown

use crate::activity::{process_start_timestamp, ActivityButton, PresenceDescriptor};
use crate::config::PresenceConfig;
use crate::connector::Connector;
use crate::publisher::{PendingSlot, Publisher};
use crate::worker::{Worker, WorkerTiming};
use crossbeam::channel::{bounded, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{error, info, warn};

/// Handle to a running worker thread
struct WorkerHandle {
    running: Arc<AtomicBool>,
    wake_tx: Sender<()>,
    thread: JoinHandle<()>,
}

/// Presence reporting client
///
/// Share it behind an `Arc` with every component that reports presence.
pub struct PresenceClient {
    publisher: Publisher,
    connector: Connector,
    timing: WorkerTiming,
    enabled: bool,
    worker: Mutex<Option<WorkerHandle>>,
}

impl PresenceClient {
    /// Client talking to the platform's presence service
    pub fn new(buttons: Vec<ActivityButton>) -> Self {
        Self::with_connector(Connector::local(), buttons, WorkerTiming::default())
    }

    /// Client built from configuration (buttons, timing and the enabled flag)
    pub fn from_config(config: &PresenceConfig) -> Self {
        Self::from_config_with_connector(Connector::local(), config)
    }

    pub fn from_config_with_connector(connector: Connector, config: &PresenceConfig) -> Self {
        let mut client = Self::with_connector(connector, config.buttons.clone(), config.timing());
        client.enabled = config.enabled;
        client
    }

    pub fn with_connector(
        connector: Connector,
        buttons: Vec<ActivityButton>,
        timing: WorkerTiming,
    ) -> Self {
        // Pin the activity start time as early as possible.
        process_start_timestamp();

        Self {
            publisher: Publisher::new(Arc::new(PendingSlot::new()), buttons),
            connector,
            timing,
            enabled: true,
            worker: Mutex::new(None),
        }
    }

    /// Start the background worker for `client_id`
    ///
    /// Does nothing if the worker is already running, or if presence is
    /// disabled in configuration.
    pub fn initialize(&self, client_id: impl Into<String>) {
        if !self.enabled {
            info!("Presence disabled in configuration");
            return;
        }

        let mut worker = self.worker.lock();
        if worker.is_some() {
            warn!("Presence client already initialized");
            return;
        }

        let client_id = client_id.into();
        let running = Arc::new(AtomicBool::new(true));
        let (wake_tx, wake_rx) = bounded(0);

        let task = Worker::new(
            client_id.clone(),
            self.connector.clone(),
            Arc::clone(self.publisher.slot()),
            Arc::clone(&running),
            wake_rx,
            self.timing,
        );

        let spawned = std::thread::Builder::new()
            .name("presence-worker".to_string())
            .spawn(move || task.run());

        match spawned {
            Ok(thread) => {
                info!("Presence client initialized for {}", client_id);
                *worker = Some(WorkerHandle {
                    running,
                    wake_tx,
                    thread,
                });
            }
            Err(e) => error!("Failed to spawn presence worker: {}", e),
        }
    }

    /// Stop the worker and close the channel
    ///
    /// Safe to call before `initialize`, or more than once.
    pub fn shutdown(&self) {
        let Some(handle) = self.worker.lock().take() else {
            return;
        };

        handle.running.store(false, Ordering::Release);
        drop(handle.wake_tx);

        if handle.thread.join().is_err() {
            error!("Presence worker panicked");
        }
        info!("Presence client shut down");
    }

    pub fn is_running(&self) -> bool {
        self.worker.lock().is_some()
    }

    /// Replace the pending activity. Never blocks on I/O.
    pub fn set_activity(&self, details: &str, state: &str, large_image_key: &str, large_text: &str) {
        self.publisher
            .set_activity(details, state, large_image_key, large_text);
    }

    pub fn publish(&self, descriptor: PresenceDescriptor) {
        self.publisher.publish(descriptor);
    }

    /// Most recently submitted descriptor
    pub fn latest_activity(&self) -> Option<PresenceDescriptor> {
        self.publisher.slot().latest()
    }
}

impl Drop for PresenceClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}
