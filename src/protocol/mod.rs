//! Binary protocol spoken by the acquisition server.
//!
//! All multi-byte fields are little-endian. Three packet layouts exist:
//!
//! ```text
//! Command (outbound):     [version: u32][command: u32]                 8 bytes
//! Response (inbound):     [version: u32][timestamp_ms: u64][status: u32]  16 bytes
//! Extra data (outbound):  [version: u32][length: u32] + JSON body
//! ```
//!
//! The two continuous streams use a fourth layout, a 16-byte header carrying
//! the body length at bytes 12..16; see [`codec::frame_length`].

pub mod codec;

pub use codec::{decode_response, encode_command, encode_extra_data, frame_length, Response};

/// The single protocol version this bridge speaks.
pub const PROTOCOL_VERSION: u32 = 1;

/// Command codes understood by the acquisition server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Handshake,
    ConnectAnalog,
    ConnectEmg,
    ConnectStim,
    DisconnectAnalog,
    DisconnectEmg,
    DisconnectStim,
    StartRecording,
    StopRecording,
    GetLastTrial,
    ZeroAnalog,
    ZeroEmg,
    AddAnalyzer,
    RemoveAnalyzer,
    Failed,
}

impl Command {
    /// Every command in the protocol table.
    pub const ALL: [Command; 15] = [
        Command::Handshake,
        Command::ConnectAnalog,
        Command::ConnectEmg,
        Command::ConnectStim,
        Command::DisconnectAnalog,
        Command::DisconnectEmg,
        Command::DisconnectStim,
        Command::StartRecording,
        Command::StopRecording,
        Command::GetLastTrial,
        Command::ZeroAnalog,
        Command::ZeroEmg,
        Command::AddAnalyzer,
        Command::RemoveAnalyzer,
        Command::Failed,
    ];

    /// Wire code for this command.
    pub const fn code(self) -> u32 {
        match self {
            Command::Handshake => 0,
            Command::ConnectAnalog => 10,
            Command::ConnectEmg => 11,
            Command::ConnectStim => 12,
            Command::DisconnectAnalog => 20,
            Command::DisconnectEmg => 21,
            Command::DisconnectStim => 22,
            Command::StartRecording => 30,
            Command::StopRecording => 31,
            Command::GetLastTrial => 32,
            Command::ZeroAnalog => 40,
            Command::ZeroEmg => 41,
            Command::AddAnalyzer => 50,
            Command::RemoveAnalyzer => 51,
            Command::Failed => 100,
        }
    }

    /// Look up a command by wire code.
    pub fn from_code(code: u32) -> Option<Command> {
        Command::ALL.iter().copied().find(|c| c.code() == code)
    }
}
