//! Synchronous command/response exchanges.
//!
//! Every exchange with the acquisition server is strictly sequential: write
//! one packet, block for the 16-byte acknowledgment. Failures are logged and
//! reported as `false` so callers can abort a multi-step sequence partway
//! through.

use crate::protocol::{codec, Command, PROTOCOL_VERSION};
use serde::Serialize;
use std::io::{Read, Write};
use std::net::TcpStream;

/// Send one command and block for its acknowledgment.
///
/// Returns true iff the server answered OK. Socket and decode failures are
/// logged and yield false.
pub fn send_command<S: Read + Write>(stream: &mut S, command: Command) -> bool {
    let packet = codec::encode_command(PROTOCOL_VERSION, command);
    if let Err(e) = stream.write_all(&packet) {
        log::error!("failed to send {:?}: {}", command, e);
        return false;
    }
    log::info!("sent command {:?} ({})", command, command.code());

    let mut reply = [0u8; codec::RESPONSE_SIZE];
    if let Err(e) = stream.read_exact(&mut reply) {
        log::error!("no response to {:?}: {}", command, e);
        return false;
    }

    match codec::decode_response(&reply) {
        Ok(response) if response.ok() => true,
        Ok(_) => {
            log::error!("command {:?} failed (NOK received)", command);
            false
        }
        Err(e) => {
            log::error!("response to {:?} invalid: {}", command, e);
            false
        }
    }
}

/// Send a JSON payload framed as extra data and block for the acknowledgment.
///
/// The payload travels on `data_stream` while the 16-byte acknowledgment is
/// read from `ack_stream`. The pairing is fixed by the server's protocol, not
/// chosen per call; see [`CommandLink::send_extra_data`].
pub fn send_extra_data<W, R, P>(data_stream: &mut W, ack_stream: &mut R, payload: &P) -> bool
where
    W: Write,
    R: Read,
    P: Serialize + ?Sized,
{
    let json = match serde_json::to_vec(payload) {
        Ok(json) => json,
        Err(e) => {
            log::error!("extra data serialization failed: {}", e);
            return false;
        }
    };

    let framed = codec::encode_extra_data(PROTOCOL_VERSION, &json);
    if let Err(e) = data_stream.write_all(&framed) {
        log::error!("failed to send extra data: {}", e);
        return false;
    }

    let mut reply = [0u8; codec::RESPONSE_SIZE];
    if let Err(e) = ack_stream.read_exact(&mut reply) {
        log::error!("no response to extra data: {}", e);
        return false;
    }

    match codec::decode_response(&reply) {
        Ok(response) if response.ok() => {
            log::info!("extra data sent successfully");
            true
        }
        Ok(_) => {
            log::error!("extra data failed (NOK received)");
            false
        }
        Err(e) => {
            log::error!("extra data response invalid: {}", e);
            false
        }
    }
}

/// The command/response connection pair.
///
/// Commands go out and every acknowledgment comes back on the command
/// connection; extra-data payloads go out on the response connection. This
/// asymmetry is what the acquisition server expects; the two 8/16-byte
/// header layouts involved are likewise never unified. The whole pair lives
/// behind one session lock so concurrent reconfiguration sequences cannot
/// interleave their round trips.
pub struct CommandLink {
    command: TcpStream,
    response: TcpStream,
}

impl CommandLink {
    pub fn new(command: TcpStream, response: TcpStream) -> Self {
        Self { command, response }
    }

    /// Send one command on the command connection; true iff acknowledged OK.
    pub fn send_command(&mut self, command: Command) -> bool {
        send_command(&mut self.command, command)
    }

    /// Push a JSON payload on the response connection and read the
    /// acknowledgment from the command connection.
    pub fn send_extra_data<P: Serialize + ?Sized>(&mut self, payload: &P) -> bool {
        send_extra_data(&mut self.response, &mut self.command, payload)
    }
}
