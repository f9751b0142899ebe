//! Data-stream worker: live sample frames to per-sensor telemetry.
//!
//! Each frame is a JSON object of named sample groups. A group's payload
//! sits at `group.data.data` as an ordered sequence of
//! `[timestamp, [channel values...]]` entries. Every entry is forwarded at
//! most once (the server repeats trailing samples across frames); each
//! forwarded entry produces one `/sensor_{n}` message per selected channel.

use crate::error::Error;
use crate::session::Session;
use crate::streaming::dedup::TimestampWindow;
use crate::streaming::frame::FrameReader;
use crate::streaming::READ_CHUNK;
use serde_json::Value;
use std::io::Read;
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct DataStreamWorker {
    stream: TcpStream,
    session: Arc<Session>,
    shutdown: Arc<AtomicBool>,
    reader: FrameReader,
    emitted: TimestampWindow,
}

impl DataStreamWorker {
    pub fn new(stream: TcpStream, session: Arc<Session>, shutdown: Arc<AtomicBool>) -> Self {
        let emitted = TimestampWindow::new(session.dedup_capacity);
        Self {
            stream,
            session,
            shutdown,
            reader: FrameReader::new(),
            emitted,
        }
    }

    /// Blocking read loop; runs until the peer closes or the socket errors.
    pub fn run(&mut self) {
        log::info!("forwarding live data as OSC telemetry");

        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => {
                    log::info!("data stream closed by peer");
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
                        log::debug!("data stream read interrupted by shutdown");
                    } else {
                        log::error!("error processing data: {}", e);
                    }
                    break;
                }
            }
        }

        let _ = self.stream.shutdown(Shutdown::Both);
        log::info!("live data connection closed");
    }

    fn handle_frame(&mut self, body: &[u8]) {
        let frame: Value = match serde_json::from_slice(body) {
            Ok(frame) => frame,
            Err(e) => {
                let e = Error::FrameDecode(e.to_string());
                log::error!("JSON decode error in live data, resetting buffer: {}", e);
                self.reader.reset();
                return;
            }
        };

        let selection = self.session.tuning.lock().selection.clone();
        let samples = translate_frame(
            &frame,
            &selection,
            self.session.data_multiplier,
            &mut self.emitted,
        );
        for (address, value) in samples {
            if let Err(e) = self.session.telemetry.send_float(&address, value) {
                log::warn!("telemetry send to {} failed: {}", address, e);
            }
        }
    }
}

/// Flatten one decoded data frame into `(address, value)` telemetry samples.
///
/// Entries whose timestamp was already emitted are skipped entirely.
/// Otherwise one sample is produced per selected 1-based channel index that
/// exists in the entry, scaled by `multiplier`.
pub fn translate_frame(
    frame: &Value,
    selection: &[u32],
    multiplier: f64,
    emitted: &mut TimestampWindow,
) -> Vec<(String, f32)> {
    let mut samples = Vec::new();
    let Some(groups) = frame.as_object() else {
        log::warn!("data frame is not an object, skipping");
        return samples;
    };

    for group in groups.values() {
        let entries = group
            .get("data")
            .and_then(|inner| inner.get("data"))
            .and_then(Value::as_array);
        let Some(entries) = entries else { continue };

        for entry in entries {
            let Some(pair) = entry.as_array() else { continue };
            let (Some(timestamp), Some(channels)) = (
                pair.first().and_then(Value::as_f64),
                pair.get(1).and_then(Value::as_array),
            ) else {
                continue;
            };

            if !emitted.insert(timestamp) {
                continue;
            }

            for &channel in selection {
                let index = channel as usize;
                if index == 0 || index > channels.len() {
                    continue;
                }
                if let Some(raw) = channels[index - 1].as_f64() {
                    samples.push((format!("/sensor_{}", channel), (raw * multiplier) as f32));
                }
            }
        }
    }

    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn emits_one_sample_per_selected_channel() {
        let frame = json!({
            "emg": { "data": { "data": [[1.0, [0.1, 0.2, 0.3]]] } }
        });
        let mut emitted = TimestampWindow::new(16);
        let samples = translate_frame(&frame, &[1, 3], 10000.0, &mut emitted);
        assert_eq!(
            samples,
            vec![
                ("/sensor_1".to_string(), 1000.0),
                ("/sensor_3".to_string(), 3000.0),
            ]
        );
    }

    #[test]
    fn repeated_timestamp_is_emitted_once() {
        let frame = json!({
            "emg": { "data": { "data": [
                [5.0, [0.1]],
                [5.0, [0.9]],
            ] } }
        });
        let mut emitted = TimestampWindow::new(16);
        let samples = translate_frame(&frame, &[1], 10000.0, &mut emitted);
        assert_eq!(samples, vec![("/sensor_1".to_string(), 1000.0)]);

        // the same timestamp in a later frame is also suppressed
        let again = translate_frame(&frame, &[1], 10000.0, &mut emitted);
        assert!(again.is_empty());
    }

    #[test]
    fn selection_outside_entry_width_is_skipped() {
        let frame = json!({
            "emg": { "data": { "data": [[1.0, [0.5, 0.6]]] } }
        });
        let mut emitted = TimestampWindow::new(16);
        let samples = translate_frame(&frame, &[2, 7], 10000.0, &mut emitted);
        assert_eq!(samples, vec![("/sensor_2".to_string(), 6000.0)]);
    }

    #[test]
    fn timestamp_is_consumed_even_with_empty_selection() {
        let frame = json!({
            "emg": { "data": { "data": [[3.0, [0.5]]] } }
        });
        let mut emitted = TimestampWindow::new(16);
        assert!(translate_frame(&frame, &[], 10000.0, &mut emitted).is_empty());
        assert!(!emitted.insert(3.0));
    }

    #[test]
    fn groups_without_sample_payload_are_ignored() {
        let frame = json!({
            "meta": { "info": "no data here" },
            "emg": { "data": { "data": [[1.0, [0.1]]] } }
        });
        let mut emitted = TimestampWindow::new(16);
        let samples = translate_frame(&frame, &[1], 10000.0, &mut emitted);
        assert_eq!(samples.len(), 1);
    }
}
