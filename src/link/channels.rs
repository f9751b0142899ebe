//! Channel setup and handshake.

use crate::error::{Error, Result};
use crate::protocol::{codec, Command, PROTOCOL_VERSION};
use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};

/// The four TCP connections to the acquisition server.
///
/// Roles are fixed by connection order: command, response, data, analyses.
/// The set is created whole at startup and closed whole at shutdown; a
/// partial set never survives [`ChannelSet::connect`].
pub struct ChannelSet {
    pub command: TcpStream,
    pub response: TcpStream,
    pub data: TcpStream,
    pub analyses: TcpStream,
}

impl ChannelSet {
    /// Open one connection per port, in order, all-or-nothing.
    ///
    /// On any failure every socket already opened is shut down and the whole
    /// set fails with [`Error::Connection`].
    pub fn connect(host: &str, ports: &[u16; 4]) -> Result<ChannelSet> {
        let mut opened: Vec<TcpStream> = Vec::with_capacity(ports.len());

        for &port in ports {
            match TcpStream::connect((host, port)) {
                Ok(stream) => {
                    log::info!("connected to {}:{}", host, port);
                    opened.push(stream);
                }
                Err(e) => {
                    for stream in &opened {
                        let _ = stream.shutdown(Shutdown::Both);
                    }
                    return Err(Error::Connection(format!("{}:{}: {}", host, port, e)));
                }
            }
        }

        let analyses = opened.pop();
        let data = opened.pop();
        let response = opened.pop();
        let command = opened.pop();
        match (command, response, data, analyses) {
            (Some(command), Some(response), Some(data), Some(analyses)) => Ok(ChannelSet {
                command,
                response,
                data,
                analyses,
            }),
            _ => Err(Error::Connection("channel set incomplete".to_string())),
        }
    }

    /// Duplicate the raw handles so the orchestrator can shut every channel
    /// down at exit, unblocking workers stuck in blocking reads.
    pub fn shutdown_handles(&self) -> Result<Vec<TcpStream>> {
        Ok(vec![
            self.command.try_clone()?,
            self.response.try_clone()?,
            self.data.try_clone()?,
            self.analyses.try_clone()?,
        ])
    }
}

/// Perform the protocol handshake on the command channel.
///
/// Sends the HANDSHAKE packet and reads exactly one 16-byte response. Only
/// decode and version are validated; the status flag is not consulted.
pub fn handshake<S: Read + Write>(command: &mut S) -> Result<()> {
    let packet = codec::encode_command(PROTOCOL_VERSION, Command::Handshake);
    command
        .write_all(&packet)
        .map_err(|e| Error::Handshake(format!("send: {}", e)))?;

    let mut reply = [0u8; codec::RESPONSE_SIZE];
    command
        .read_exact(&mut reply)
        .map_err(|e| Error::Handshake(format!("receive: {}", e)))?;

    match codec::decode_response(&reply) {
        Ok(response) => {
            log::info!(
                "handshake successful (server time {:.3}s)",
                response.timestamp_secs()
            );
            Ok(())
        }
        Err(e) => Err(Error::Handshake(e.to_string())),
    }
}
