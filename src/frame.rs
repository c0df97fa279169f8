//! Frame codec for the presence channel
//!
//! Wire layout of one frame:
//!
//! ```text
//! +----------------+----------------+---------------------------+
//! | opcode: i32 LE | length: i32 LE | payload: `length` bytes   |
//! +----------------+----------------+---------------------------+
//! ```
//!
//! The payload is UTF-8 JSON. The client only ever writes frames, but
//! [`decode`] and [`read_frame`] are provided so the format can be checked
//! from the service side as well.

use crate::error::FrameError;
use std::io::Read;

/// Size of the fixed frame header in bytes
pub const HEADER_SIZE: usize = 8;

/// Largest payload the signed 32-bit length field can describe
pub const MAX_PAYLOAD_LEN: usize = i32::MAX as usize;

/// Frame opcodes understood by the presence service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// First message on a new connection, identifies the client
    Handshake,
    /// Command payload (e.g. `SET_ACTIVITY`)
    Frame,
    /// Any value without a named variant
    Other(u32),
}

impl From<u32> for Opcode {
    fn from(value: u32) -> Self {
        match value {
            0 => Opcode::Handshake,
            1 => Opcode::Frame,
            other => Opcode::Other(other),
        }
    }
}

impl From<Opcode> for u32 {
    fn from(opcode: Opcode) -> Self {
        match opcode {
            Opcode::Handshake => 0,
            Opcode::Frame => 1,
            Opcode::Other(value) => value,
        }
    }
}

/// A decoded frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub opcode: Opcode,
    pub payload: String,
}

/// Total encoded size for a payload of `payload_len` bytes
pub fn encoded_len(payload_len: usize) -> Result<usize, FrameError> {
    if payload_len > MAX_PAYLOAD_LEN {
        return Err(FrameError::FrameTooLarge {
            len: payload_len,
            max: MAX_PAYLOAD_LEN,
        });
    }
    Ok(HEADER_SIZE + payload_len)
}

/// Encode a frame into its wire representation
pub fn encode(opcode: Opcode, payload: &str) -> Result<Vec<u8>, FrameError> {
    let total = encoded_len(payload.len())?;

    let mut packet = Vec::with_capacity(total);
    packet.extend_from_slice(&u32::from(opcode).to_le_bytes());
    packet.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    packet.extend_from_slice(payload.as_bytes());

    Ok(packet)
}

/// Parse the 8-byte header into (opcode, payload length)
fn parse_header(header: &[u8; HEADER_SIZE]) -> Result<(Opcode, usize), FrameError> {
    let opcode = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let length = i32::from_le_bytes([header[4], header[5], header[6], header[7]]);

    if length < 0 {
        return Err(FrameError::InvalidLength(length));
    }

    Ok((Opcode::from(opcode), length as usize))
}

/// Decode one frame from the front of `bytes`
///
/// Returns the frame and the number of bytes it occupied, so callers can
/// walk a buffer holding several frames back to back.
pub fn decode(bytes: &[u8]) -> Result<(Frame, usize), FrameError> {
    let header: &[u8; HEADER_SIZE] = bytes
        .get(..HEADER_SIZE)
        .and_then(|h| h.try_into().ok())
        .ok_or(FrameError::Truncated {
            needed: HEADER_SIZE,
            available: bytes.len(),
        })?;

    let (opcode, length) = parse_header(header)?;
    let end = HEADER_SIZE + length;

    let body = bytes.get(HEADER_SIZE..end).ok_or(FrameError::Truncated {
        needed: end,
        available: bytes.len(),
    })?;

    let payload = String::from_utf8(body.to_vec())?;
    Ok((Frame { opcode, payload }, end))
}

/// Read exactly one frame from a byte stream
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Frame, FrameError> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let (opcode, length) = parse_header(&header)?;

    // Grow with the bytes actually received rather than trusting the header.
    let mut body = Vec::new();
    reader.take(length as u64).read_to_end(&mut body)?;
    if body.len() < length {
        return Err(FrameError::Truncated {
            needed: HEADER_SIZE + length,
            available: HEADER_SIZE + body.len(),
        });
    }

    Ok(Frame {
        opcode,
        payload: String::from_utf8(body)?,
    })
}
