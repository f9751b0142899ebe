//! Analyses-stream worker: analyzer result frames to named telemetry.
//!
//! Each frame carries a `data` object mapping analysis names to results. A
//! result is forwarded when it is a sequence of at least two elements whose
//! second element is itself a sequence; that inner sequence becomes the OSC
//! argument list, addressed by the analysis name with spaces replaced by
//! underscores. Any other shape is logged as malformed and skipped without
//! aborting the stream.

use crate::error::Error;
use crate::osc::telemetry::osc_arg;
use crate::session::Session;
use crate::streaming::frame::FrameReader;
use crate::streaming::READ_CHUNK;
use rosc::OscType;
use serde_json::Value;
use std::io::Read;
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct AnalysesStreamWorker {
    stream: TcpStream,
    session: Arc<Session>,
    shutdown: Arc<AtomicBool>,
    reader: FrameReader,
}

impl AnalysesStreamWorker {
    pub fn new(stream: TcpStream, session: Arc<Session>, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            stream,
            session,
            shutdown,
            reader: FrameReader::new(),
        }
    }

    /// Blocking read loop; runs until the peer closes or the socket errors.
    pub fn run(&mut self) {
        log::info!("forwarding live analyses as OSC telemetry");

        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => {
                    log::info!("analyses stream closed by peer");
                    break;
                }
                Ok(n) => {
                    self.reader.extend(&chunk[..n]);
                    while let Some(body) = self.reader.next_frame() {
                        self.handle_frame(&body);
                    }
                }
                Err(e) => {
                    if self.shutdown.load(Ordering::Relaxed) {
                        log::debug!("analyses stream read interrupted by shutdown");
                    } else {
                        log::error!("error processing analysis data: {}", e);
                    }
                    break;
                }
            }
        }

        let _ = self.stream.shutdown(Shutdown::Both);
        log::info!("live analysis connection closed");
    }

    fn handle_frame(&mut self, body: &[u8]) {
        let frame: Value = match serde_json::from_slice(body) {
            Ok(frame) => frame,
            Err(e) => {
                let e = Error::FrameDecode(e.to_string());
                log::error!(
                    "JSON decode error in analysis data, resetting buffer: {}",
                    e
                );
                self.reader.reset();
                return;
            }
        };

        for (address, args) in translate_frame(&frame) {
            if let Err(e) = self.session.telemetry.send(&address, args) {
                log::warn!("telemetry send to {} failed: {}", address, e);
            }
        }
    }
}

/// Extract `(address, argument list)` messages from one analyses frame.
pub fn translate_frame(frame: &Value) -> Vec<(String, Vec<OscType>)> {
    let mut messages = Vec::new();
    let Some(data) = frame.get("data").and_then(Value::as_object) else {
        return messages;
    };

    for (name, analysis) in data {
        let payload = analysis
            .as_array()
            .filter(|items| items.len() >= 2)
            .and_then(|items| items[1].as_array());
        let Some(values) = payload else {
            log::error!("unexpected format in '{}' data", name);
            continue;
        };

        let address = format!("/{}", name.replace(' ', "_"));
        let args = values.iter().filter_map(osc_arg).collect();
        messages.push((address, args));
    }

    messages
}
