//! Continuous-stream decoding and forwarding.
//!
//! The data and analyses channels each deliver an endless sequence of
//! length-delimited frames (16-byte header + JSON body). Each channel is
//! read by exactly one worker thread that owns its socket: raw reads feed a
//! [`frame::FrameReader`], complete frames are decoded and translated into
//! OSC telemetry. A worker terminates when the peer closes, on a socket
//! error, or when shutdown closes its socket from the controlling thread;
//! no other worker is affected.

pub mod analyses;
pub mod data;
pub mod dedup;
pub mod frame;

pub use analyses::AnalysesStreamWorker;
pub use data::DataStreamWorker;
pub use frame::FrameReader;

/// Blocking read size for stream sockets.
pub(crate) const READ_CHUNK: usize = 4096;
