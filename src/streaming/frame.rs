//! Incremental reassembly of length-delimited stream frames.

use crate::protocol::codec::{frame_length, STREAM_HEADER_SIZE};

/// Reassembly state.
enum ReadState {
    /// Waiting for a complete 16-byte header.
    AwaitingHeader,
    /// Header consumed; waiting for `length` body bytes.
    AwaitingBody { length: usize },
}

/// Incremental frame reader for one continuous stream.
///
/// Socket reads of any size are appended with [`extend`](Self::extend);
/// [`next_frame`](Self::next_frame) yields complete bodies one at a time. A
/// frame is consumed atomically: all 16 header bytes, then exactly `length`
/// body bytes. Partial frames are never emitted.
pub struct FrameReader {
    buffer: Vec<u8>,
    state: ReadState,
}

impl FrameReader {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            state: ReadState::AwaitingHeader,
        }
    }

    /// Append raw bytes read from the socket.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Produce the next complete frame body, if enough data has accumulated.
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        loop {
            match self.state {
                ReadState::AwaitingHeader => {
                    if self.buffer.len() < STREAM_HEADER_SIZE {
                        return None;
                    }
                    let mut header = [0u8; STREAM_HEADER_SIZE];
                    header.copy_from_slice(&self.buffer[..STREAM_HEADER_SIZE]);
                    self.buffer.drain(..STREAM_HEADER_SIZE);
                    self.state = ReadState::AwaitingBody {
                        length: frame_length(&header) as usize,
                    };
                }
                ReadState::AwaitingBody { length } => {
                    if self.buffer.len() < length {
                        return None;
                    }
                    let body: Vec<u8> = self.buffer.drain(..length).collect();
                    self.state = ReadState::AwaitingHeader;
                    return Some(body);
                }
            }
        }
    }

    /// Drop everything buffered and wait for a fresh header.
    ///
    /// Called after a frame body fails to decode. There is no marker to find
    /// the next valid header in the remaining bytes, so resynchronization is
    /// lossy: whatever was buffered is discarded and the stream picks up
    /// again from subsequent reads.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = ReadState::AwaitingHeader;
    }
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_bytes(body: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0u8; STREAM_HEADER_SIZE];
        bytes[12..16].copy_from_slice(&(body.len() as u32).to_le_bytes());
        bytes.extend_from_slice(body);
        bytes
    }

    #[test]
    fn reassembles_frame_from_arbitrary_chunks() {
        let body = br#"{"group":{"data":{"data":[[1.0,[0.5]]]}}}"#;
        let wire = frame_bytes(body);

        for chunk_size in 1..=wire.len() {
            let mut reader = FrameReader::new();
            let mut frames = Vec::new();
            for chunk in wire.chunks(chunk_size) {
                reader.extend(chunk);
                while let Some(frame) = reader.next_frame() {
                    frames.push(frame);
                }
            }
            assert_eq!(frames.len(), 1, "chunk size {}", chunk_size);
            assert_eq!(frames[0], body, "chunk size {}", chunk_size);
        }
    }

    #[test]
    fn yields_consecutive_frames_from_one_read() {
        let mut wire = frame_bytes(b"first");
        wire.extend_from_slice(&frame_bytes(b"second"));
        wire.extend_from_slice(&frame_bytes(b"third"));

        let mut reader = FrameReader::new();
        reader.extend(&wire);
        assert_eq!(reader.next_frame().as_deref(), Some(&b"first"[..]));
        assert_eq!(reader.next_frame().as_deref(), Some(&b"second"[..]));
        assert_eq!(reader.next_frame().as_deref(), Some(&b"third"[..]));
        assert_eq!(reader.next_frame(), None);
    }

    #[test]
    fn header_split_across_reads() {
        let wire = frame_bytes(b"payload");
        let mut reader = FrameReader::new();
        reader.extend(&wire[..10]);
        assert_eq!(reader.next_frame(), None);
        reader.extend(&wire[10..]);
        assert_eq!(reader.next_frame().as_deref(), Some(&b"payload"[..]));
    }

    #[test]
    fn zero_length_frame_is_emitted_empty() {
        let mut reader = FrameReader::new();
        reader.extend(&frame_bytes(b""));
        assert_eq!(reader.next_frame().as_deref(), Some(&b""[..]));
    }

    #[test]
    fn reset_discards_everything_buffered() {
        let mut reader = FrameReader::new();
        let mut wire = frame_bytes(b"garbled");
        wire.extend_from_slice(&frame_bytes(b"pending"));
        reader.extend(&wire);

        assert_eq!(reader.next_frame().as_deref(), Some(&b"garbled"[..]));
        reader.reset();
        // the buffered second frame is gone; a fresh frame still parses
        assert_eq!(reader.next_frame(), None);
        reader.extend(&frame_bytes(b"fresh"));
        assert_eq!(reader.next_frame().as_deref(), Some(&b"fresh"[..]));
    }
}
