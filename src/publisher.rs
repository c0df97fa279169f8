//! Pending-update slot shared between callers and the worker
//!
//! Holds at most one update. Submitting while an earlier update is still
//! undelivered overwrites it (last write wins); there is no queue and no
//! backpressure. The lock is only held to swap values in and out.

use crate::activity::{next_nonce, ActivityButton, PresenceDescriptor};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

/// A descriptor together with its serialized `SET_ACTIVITY` payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUpdate {
    pub descriptor: PresenceDescriptor,
    pub payload: String,
}

#[derive(Debug, Default)]
struct SlotState {
    latest: Option<PendingUpdate>,
    dirty: bool,
}

/// Single-slot, last-write-wins update buffer
#[derive(Debug, Default)]
pub struct PendingSlot {
    state: Mutex<SlotState>,
}

impl PendingSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `update` and mark the slot dirty
    ///
    /// Returns true if an undelivered update was discarded.
    pub fn replace(&self, update: PendingUpdate) -> bool {
        let mut state = self.state.lock();
        let coalesced = state.dirty;
        state.latest = Some(update);
        state.dirty = true;
        coalesced
    }

    /// Take the dirty update for delivery, clearing the dirty flag
    ///
    /// The value stays in the slot so it can be re-armed for a new session.
    pub fn take(&self) -> Option<PendingUpdate> {
        let mut state = self.state.lock();
        if !state.dirty {
            return None;
        }
        state.dirty = false;
        state.latest.clone()
    }

    /// Mark the last submitted update as undelivered again
    ///
    /// Returns true if there was anything to re-arm.
    pub fn rearm(&self) -> bool {
        let mut state = self.state.lock();
        state.dirty = state.latest.is_some();
        state.dirty
    }

    pub fn is_dirty(&self) -> bool {
        self.state.lock().dirty
    }

    /// Most recently submitted descriptor, delivered or not
    pub fn latest(&self) -> Option<PresenceDescriptor> {
        self.state
            .lock()
            .latest
            .as_ref()
            .map(|update| update.descriptor.clone())
    }
}

/// Builds activity payloads and drops them into the shared slot
///
/// Never performs I/O, so it is safe to call from UI threads.
#[derive(Debug, Clone)]
pub struct Publisher {
    slot: Arc<PendingSlot>,
    buttons: Arc<[ActivityButton]>,
}

impl Publisher {
    pub fn new(slot: Arc<PendingSlot>, buttons: Vec<ActivityButton>) -> Self {
        Self {
            slot,
            buttons: buttons.into(),
        }
    }

    pub fn slot(&self) -> &Arc<PendingSlot> {
        &self.slot
    }

    /// Publish a new activity, replacing any pending one
    pub fn set_activity(&self, details: &str, state: &str, large_image_key: &str, large_text: &str) {
        let descriptor = PresenceDescriptor::new(details, state, large_image_key, large_text);
        self.publish(descriptor);
    }

    /// Publish a prebuilt descriptor
    pub fn publish(&self, descriptor: PresenceDescriptor) {
        let payload = match descriptor.to_command_json(&self.buttons, next_nonce()) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Failed to serialize activity: {}", e);
                return;
            }
        };

        if self.slot.replace(PendingUpdate {
            descriptor,
            payload,
        }) {
            debug!("Coalesced undelivered activity update");
        }
    }
}
