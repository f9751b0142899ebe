//! Fixed-layout packet codecs.
//!
//! The outbound extra-data header (8 bytes) and the inbound stream-frame
//! header (16 bytes) are distinct layouts on distinct channels. They are kept
//! as separate code paths; [`frame_length`] is never applied to
//! command/response packets.

use super::{Command, PROTOCOL_VERSION};
use crate::error::{Error, Result};

/// Size of an outbound command packet.
pub const COMMAND_SIZE: usize = 8;

/// Size of every response packet.
pub const RESPONSE_SIZE: usize = 16;

/// Size of an inbound stream-frame header.
pub const STREAM_HEADER_SIZE: usize = 16;

/// Offset of the body length inside a stream-frame header.
const STREAM_LENGTH_OFFSET: usize = 12;

/// Decoded 16-byte response packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response {
    pub version: u32,
    /// Server clock, milliseconds since the UNIX epoch.
    pub timestamp_ms: u64,
    /// 0 = NOK, 1 = OK.
    pub status: u32,
}

impl Response {
    /// True iff the server acknowledged with OK.
    pub fn ok(&self) -> bool {
        self.status == 1
    }

    /// Server timestamp in UTC seconds.
    pub fn timestamp_secs(&self) -> f64 {
        self.timestamp_ms as f64 / 1000.0
    }
}

/// Encode an 8-byte command packet.
pub fn encode_command(version: u32, command: Command) -> [u8; COMMAND_SIZE] {
    let mut packet = [0u8; COMMAND_SIZE];
    packet[..4].copy_from_slice(&version.to_le_bytes());
    packet[4..].copy_from_slice(&command.code().to_le_bytes());
    packet
}

/// Decode a 16-byte response packet.
///
/// Rejects any buffer that is not exactly 16 bytes, carries a version other
/// than [`PROTOCOL_VERSION`], or a status outside {0, 1}.
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    if bytes.len() != RESPONSE_SIZE {
        return Err(Error::Protocol(format!(
            "invalid response length: {} (expected {})",
            bytes.len(),
            RESPONSE_SIZE
        )));
    }

    let mut version = [0u8; 4];
    version.copy_from_slice(&bytes[0..4]);
    let version = u32::from_le_bytes(version);

    let mut timestamp_ms = [0u8; 8];
    timestamp_ms.copy_from_slice(&bytes[4..12]);
    let timestamp_ms = u64::from_le_bytes(timestamp_ms);

    let mut status = [0u8; 4];
    status.copy_from_slice(&bytes[12..16]);
    let status = u32::from_le_bytes(status);

    if version != PROTOCOL_VERSION {
        return Err(Error::Protocol(format!(
            "invalid protocol version: {}",
            version
        )));
    }
    if status > 1 {
        return Err(Error::Protocol(format!("non-boolean status: {}", status)));
    }

    Ok(Response {
        version,
        timestamp_ms,
        status,
    })
}

/// Frame a JSON payload with the 8-byte extra-data header.
pub fn encode_extra_data(version: u32, json: &[u8]) -> Vec<u8> {
    let mut framed = Vec::with_capacity(8 + json.len());
    framed.extend_from_slice(&version.to_le_bytes());
    framed.extend_from_slice(&(json.len() as u32).to_le_bytes());
    framed.extend_from_slice(json);
    framed
}

/// Body length of an inbound stream frame, read from header bytes 12..16.
///
/// The remaining header bytes are not interpreted by the bridge.
pub fn frame_length(header: &[u8; STREAM_HEADER_SIZE]) -> u32 {
    let mut length = [0u8; 4];
    length.copy_from_slice(&header[STREAM_LENGTH_OFFSET..STREAM_LENGTH_OFFSET + 4]);
    u32::from_le_bytes(length)
}
