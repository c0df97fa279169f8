//! In-memory presence service used by unit tests

use crate::connector::{channel_addresses, Connector, Transport};
use crate::frame::{decode, Frame};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Default)]
struct ServiceState {
    listening: HashSet<PathBuf>,
    written: Vec<u8>,
    opens: usize,
    closes: usize,
    fail_writes: bool,
}

/// Fake presence service: records every byte written and every handle
/// opened or closed
#[derive(Clone, Default)]
pub(crate) struct MockService {
    state: Arc<Mutex<ServiceState>>,
}

impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    fn address(ordinal: u8) -> PathBuf {
        channel_addresses(Path::new("mock"))[ordinal as usize].clone()
    }

    pub fn listen(&self, ordinal: u8) {
        self.state.lock().listening.insert(Self::address(ordinal));
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    pub fn opens(&self) -> usize {
        self.state.lock().opens
    }

    pub fn closes(&self) -> usize {
        self.state.lock().closes
    }

    /// Every frame written so far, across all connections
    pub fn frames(&self) -> Vec<Frame> {
        let state = self.state.lock();
        let mut frames = Vec::new();
        let mut offset = 0;
        while offset < state.written.len() {
            let (frame, used) = decode(&state.written[offset..]).expect("malformed frame");
            frames.push(frame);
            offset += used;
        }
        frames
    }

    pub fn connector(&self) -> Connector {
        Connector::new(Arc::new(self.clone()), channel_addresses(Path::new("mock")))
    }
}

impl Transport for MockService {
    fn open(&self, address: &Path) -> io::Result<Box<dyn Write + Send>> {
        let mut state = self.state.lock();
        if !state.listening.contains(address) {
            return Err(io::Error::new(io::ErrorKind::NotFound, "nobody listening"));
        }
        state.opens += 1;
        Ok(Box::new(MockStream {
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockStream {
    state: Arc<Mutex<ServiceState>>,
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        if state.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"));
        }
        state.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for MockStream {
    fn drop(&mut self) {
        self.state.lock().closes += 1;
    }
}
