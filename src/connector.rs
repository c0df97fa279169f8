//! Channel discovery for the local presence service
//!
//! The service listens on one of ten well-known local endpoints
//! (`discord-ipc-0` .. `discord-ipc-9`). We try them in ascending order and
//! keep the first that opens.
//!
//! - Windows: named pipes under `\\.\pipe\`
//! - Unix: domain sockets in the user's runtime directory

use crate::error::{ConnectError, SendError};
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, trace};

/// File name prefix shared by every candidate endpoint
pub const CHANNEL_NAME_PREFIX: &str = "discord-ipc-";

/// Number of ordinal suffixes tried (0..=9)
pub const CHANNEL_SLOTS: u8 = 10;

/// Named pipe namespace on Windows
pub const PIPE_NAMESPACE: &str = r"\\.\pipe\";

/// Opens a bidirectional byte stream to a channel address
///
/// The production implementation is [`LocalTransport`]; tests substitute an
/// in-memory service.
pub trait Transport: Send + Sync {
    fn open(&self, address: &Path) -> io::Result<Box<dyn Write + Send>>;
}

/// Platform IPC transport (named pipe or Unix domain socket)
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalTransport;

impl Transport for LocalTransport {
    #[cfg(windows)]
    fn open(&self, address: &Path) -> io::Result<Box<dyn Write + Send>> {
        Ok(Box::new(pipe::PipeStream::open(address)?))
    }

    #[cfg(unix)]
    fn open(&self, address: &Path) -> io::Result<Box<dyn Write + Send>> {
        let stream = std::os::unix::net::UnixStream::connect(address)?;
        Ok(Box::new(stream))
    }

    #[cfg(not(any(windows, unix)))]
    fn open(&self, _address: &Path) -> io::Result<Box<dyn Write + Send>> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "no local IPC transport for this platform",
        ))
    }
}

/// Candidate addresses inside `dir`, in connect order
pub fn channel_addresses(dir: &Path) -> Vec<PathBuf> {
    (0..CHANNEL_SLOTS)
        .map(|n| dir.join(format!("{}{}", CHANNEL_NAME_PREFIX, n)))
        .collect()
}

/// Candidate addresses for the current platform
pub fn default_addresses() -> Vec<PathBuf> {
    #[cfg(windows)]
    {
        channel_addresses(Path::new(PIPE_NAMESPACE))
    }

    #[cfg(not(windows))]
    {
        let dir = directories::BaseDirs::new()
            .and_then(|dirs| dirs.runtime_dir().map(Path::to_path_buf))
            .unwrap_or_else(std::env::temp_dir);
        channel_addresses(&dir)
    }
}

/// Tries candidate addresses and opens the first live channel
#[derive(Clone)]
pub struct Connector {
    transport: Arc<dyn Transport>,
    addresses: Vec<PathBuf>,
}

impl Connector {
    pub fn new(transport: Arc<dyn Transport>, addresses: Vec<PathBuf>) -> Self {
        Self {
            transport,
            addresses,
        }
    }

    /// Connector for the platform's real presence service
    pub fn local() -> Self {
        Self::new(Arc::new(LocalTransport), default_addresses())
    }

    pub fn addresses(&self) -> &[PathBuf] {
        &self.addresses
    }

    /// Try every candidate in order and return the first that opens
    ///
    /// `running` is checked before each attempt and once more after a
    /// successful open; if it has been cleared the freshly opened handle is
    /// released before returning [`ConnectError::ShutdownWhileConnecting`].
    pub fn connect(&self, running: &AtomicBool) -> Result<OpenChannel, ConnectError> {
        for address in &self.addresses {
            if !running.load(Ordering::Acquire) {
                return Err(ConnectError::ShutdownWhileConnecting);
            }

            match self.transport.open(address) {
                Ok(stream) => {
                    let mut channel = OpenChannel::new(address.clone(), stream);

                    if !running.load(Ordering::Acquire) {
                        channel.close();
                        return Err(ConnectError::ShutdownWhileConnecting);
                    }

                    info!("Connected to presence channel: {}", address.display());
                    return Ok(channel);
                }
                Err(e) => {
                    trace!("Channel {} unavailable: {}", address.display(), e);
                }
            }
        }

        Err(ConnectError::NoServiceListening {
            attempted: self.addresses.len(),
        })
    }
}

/// An open channel to the presence service
///
/// The handle is released on the first send failure, on [`close`], or on
/// drop, whichever comes first.
///
/// [`close`]: OpenChannel::close
pub struct OpenChannel {
    address: PathBuf,
    stream: Option<Box<dyn Write + Send>>,
}

impl OpenChannel {
    fn new(address: PathBuf, stream: Box<dyn Write + Send>) -> Self {
        Self {
            address,
            stream: Some(stream),
        }
    }

    pub fn address(&self) -> &Path {
        &self.address
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Blocking write of a whole encoded frame
    ///
    /// A write that makes no progress or fails at the OS level is fatal:
    /// the handle is closed before the error is returned.
    pub fn send(&mut self, bytes: &[u8]) -> Result<(), SendError> {
        let stream = self.stream.as_mut().ok_or(SendError::NotConnected)?;

        let result = write_frame(&mut **stream, bytes);
        if result.is_err() {
            self.close();
        }
        result
    }

    /// Release the OS handle. Returns false if it was already closed.
    pub fn close(&mut self) -> bool {
        match self.stream.take() {
            Some(stream) => {
                drop(stream);
                debug!("Closed presence channel: {}", self.address.display());
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for OpenChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenChannel")
            .field("address", &self.address)
            .field("open", &self.is_open())
            .finish()
    }
}

impl Drop for OpenChannel {
    fn drop(&mut self) {
        self.close();
    }
}

fn write_frame(stream: &mut (dyn Write + Send), bytes: &[u8]) -> Result<(), SendError> {
    let mut written = 0;

    while written < bytes.len() {
        match stream.write(&bytes[written..]) {
            Ok(0) => {
                return Err(SendError::ShortWrite {
                    written,
                    expected: bytes.len(),
                })
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(SendError::Failure(e)),
        }
    }

    stream.flush().map_err(SendError::Failure)
}

/// Client side of a Windows named pipe
#[cfg(windows)]
mod pipe {
    use std::io::{self, Write};
    use std::os::windows::ffi::OsStrExt;
    use std::path::Path;
    use windows::Win32::{Foundation::*, Storage::FileSystem::*};

    pub struct PipeStream {
        pipe_handle: HANDLE,
    }

    fn to_io_error(e: windows::core::Error) -> io::Error {
        io::Error::from_raw_os_error(e.code().0 & 0xFFFF)
    }

    impl PipeStream {
        pub fn open(address: &Path) -> io::Result<Self> {
            let pipe_name: Vec<u16> = address.as_os_str().encode_wide().chain(Some(0)).collect();

            let pipe_handle = unsafe {
                CreateFileW(
                    windows::core::PCWSTR(pipe_name.as_ptr()),
                    (FILE_GENERIC_READ.0 | FILE_GENERIC_WRITE.0).into(),
                    FILE_SHARE_NONE,
                    None,
                    OPEN_EXISTING,
                    FILE_ATTRIBUTE_NORMAL,
                    HANDLE::default(),
                )
            }
            .map_err(to_io_error)?;

            if pipe_handle.is_invalid() {
                return Err(io::Error::new(io::ErrorKind::NotFound, "invalid pipe handle"));
            }

            Ok(Self { pipe_handle })
        }
    }

    impl Write for PipeStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let mut bytes_written = 0u32;
            unsafe { WriteFile(self.pipe_handle, Some(buf), Some(&mut bytes_written), None) }
                .map_err(to_io_error)?;
            Ok(bytes_written as usize)
        }

        fn flush(&mut self) -> io::Result<()> {
            unsafe { FlushFileBuffers(self.pipe_handle) }.map_err(to_io_error)
        }
    }

    impl Drop for PipeStream {
        fn drop(&mut self) {
            unsafe {
                let _ = CloseHandle(self.pipe_handle);
            }
        }
    }
}
