//! Session state machine
//!
//! ```text
//! Disconnected --connect--> Handshaking --handshake sent--> Ready
//!      ^                                                      |
//!      +---------------- any connect/send failure ------------+
//! ```
//!
//! The handshake is not acknowledged by the service, so the session moves to
//! `Ready` as soon as the handshake frame has been written.

use crate::activity::Handshake;
use crate::connector::{Connector, OpenChannel};
use crate::error::{PresenceError, SendError};
use crate::frame::{encode, Opcode};
use std::sync::atomic::AtomicBool;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Disconnected,
    Handshaking,
    Ready,
}

/// Connection state owned by the worker thread
pub struct Session {
    status: SessionStatus,
    channel: Option<OpenChannel>,
    client_id: String,
}

impl Session {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            status: SessionStatus::Disconnected,
            channel: None,
            client_id: client_id.into(),
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn is_ready(&self) -> bool {
        self.status == SessionStatus::Ready
    }

    /// Open a channel and send the handshake
    ///
    /// On success the session is `Ready`. On any failure it is left
    /// `Disconnected` with no handle.
    pub fn establish(
        &mut self,
        connector: &Connector,
        running: &AtomicBool,
    ) -> Result<(), PresenceError> {
        if self.status != SessionStatus::Disconnected {
            self.disconnect();
        }

        let channel = connector.connect(running)?;
        self.channel = Some(channel);
        self.status = SessionStatus::Handshaking;

        let handshake = serde_json::to_string(&Handshake::new(&self.client_id))?;
        if let Err(e) = self.write(Opcode::Handshake, &handshake) {
            warn!("Presence handshake failed: {}", e);
            return Err(e);
        }

        self.status = SessionStatus::Ready;
        info!("Presence session ready (client {})", self.client_id);
        Ok(())
    }

    /// Send a command payload as an opcode 1 frame
    ///
    /// Only allowed while `Ready`. A failed send drops the session.
    pub fn send_payload(&mut self, payload: &str) -> Result<(), PresenceError> {
        if self.status != SessionStatus::Ready {
            return Err(SendError::NotConnected.into());
        }

        self.write(Opcode::Frame, payload)
    }

    fn write(&mut self, opcode: Opcode, payload: &str) -> Result<(), PresenceError> {
        let result = match encode(opcode, payload) {
            Ok(bytes) => match self.channel.as_mut() {
                Some(channel) => channel.send(&bytes).map_err(PresenceError::from),
                None => Err(SendError::NotConnected.into()),
            },
            // Oversized payloads never reach the channel and do not drop the
            // session.
            Err(e) => return Err(e.into()),
        };

        if result.is_err() {
            self.disconnect();
        }
        result
    }

    /// Close the channel (if any) and return to `Disconnected`
    pub fn disconnect(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            if channel.close() {
                info!("Presence session disconnected");
            }
        }
        self.status = SessionStatus::Disconnected;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConnectError;
    use crate::test_support::MockService;

    fn running() -> AtomicBool {
        AtomicBool::new(true)
    }

    #[test]
    fn test_new_session_is_disconnected() {
        let session = Session::new("123");
        assert_eq!(session.status(), SessionStatus::Disconnected);
        assert_eq!(session.client_id(), "123");
    }

    #[test]
    fn test_establish_sends_handshake_and_becomes_ready() {
        let service = MockService::new();
        service.listen(0);

        let mut session = Session::new("1353177735031423028");
        session.establish(&service.connector(), &running()).unwrap();
        assert!(session.is_ready());

        let frames = service.frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].opcode, Opcode::Handshake);
        assert_eq!(
            frames[0].payload,
            r#"{"v":1,"client_id":"1353177735031423028"}"#
        );
    }

    #[test]
    fn test_establish_without_service() {
        let service = MockService::new();
        let mut session = Session::new("1");

        let err = session.establish(&service.connector(), &running()).unwrap_err();
        assert!(err.is_no_service());
        assert_eq!(session.status(), SessionStatus::Disconnected);
    }

    #[test]
    fn test_failed_handshake_leaves_session_disconnected() {
        let service = MockService::new();
        service.listen(0);
        service.fail_writes(true);

        let mut session = Session::new("1");
        assert!(session.establish(&service.connector(), &running()).is_err());
        assert_eq!(session.status(), SessionStatus::Disconnected);
        assert_eq!(service.opens(), 1);
        assert_eq!(service.closes(), 1);
    }

    #[test]
    fn test_payload_rejected_unless_ready() {
        let mut session = Session::new("1");
        let err = session.send_payload("{}").unwrap_err();
        assert!(matches!(err, PresenceError::Send(SendError::NotConnected)));
    }

    #[test]
    fn test_send_failure_disconnects() {
        let service = MockService::new();
        service.listen(0);

        let mut session = Session::new("1");
        session.establish(&service.connector(), &running()).unwrap();
        session.send_payload(r#"{"cmd":"SET_ACTIVITY"}"#).unwrap();

        service.fail_writes(true);
        assert!(session.send_payload("{}").is_err());
        assert_eq!(session.status(), SessionStatus::Disconnected);
        assert_eq!(service.closes(), 1);

        let frames = service.frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].opcode, Opcode::Frame);
    }

    #[test]
    fn test_shutdown_race_reported() {
        let service = MockService::new();
        service.listen(0);

        let mut session = Session::new("1");
        let err = session
            .establish(&service.connector(), &AtomicBool::new(false))
            .unwrap_err();
        assert!(matches!(
            err,
            PresenceError::Connect(ConnectError::ShutdownWhileConnecting)
        ));
        assert!(err.is_shutdown_race());
        assert!(!err.is_no_service());
        assert_eq!(session.status(), SessionStatus::Disconnected);
    }

    #[test]
    fn test_drop_closes_channel_once() {
        let service = MockService::new();
        service.listen(0);

        let mut session = Session::new("1");
        session.establish(&service.connector(), &running()).unwrap();
        session.disconnect();
        drop(session);
        assert_eq!(service.closes(), 1);
    }
}
