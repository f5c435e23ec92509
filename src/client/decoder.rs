//! Incremental parser for the event-stream framing

use bytes::{Buf, BytesMut};

use crate::error::{Result, RoomcastError};

/// Largest event accepted before the stream is treated as broken
pub const MAX_EVENT_BYTES: usize = 256 * 1024;

/// One `event`/`data` pair as received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub event: String,
    pub data: String,
}

/// Splits a byte stream into events.
///
/// Chunks may end anywhere, including inside a multi-byte character.
/// Comment lines (`:`) and unknown fields are skipped; multiple `data`
/// lines are joined with `\n`; events without a name default to `message`.
/// An event that grows past the size limit fails the decoder.
#[derive(Debug)]
pub struct FrameDecoder {
    buffer: BytesMut,
    event: Option<String>,
    data: Vec<String>,
    data_len: usize,
    max_event_bytes: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::with_limit(MAX_EVENT_BYTES)
    }

    pub fn with_limit(max_event_bytes: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            event: None,
            data: Vec::new(),
            data_len: 0,
            max_event_bytes,
        }
    }

    /// Feed a chunk and collect every event it completes
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<RawEvent>> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line = self.buffer.split_to(pos);
            self.buffer.advance(1);
            let line = String::from_utf8_lossy(&line);
            let line = line.strip_suffix('\r').unwrap_or(&line);

            if line.is_empty() {
                if let Some(event) = self.dispatch() {
                    events.push(event);
                }
                continue;
            }
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            match field {
                "event" => self.event = Some(value.to_string()),
                "data" => {
                    self.data_len += value.len();
                    self.data.push(value.to_string());
                }
                _ => {}
            }
        }

        if self.buffer.len() + self.data_len > self.max_event_bytes {
            self.buffer.clear();
            self.event = None;
            self.data.clear();
            self.data_len = 0;
            return Err(RoomcastError::StreamError(format!(
                "Event exceeds {} bytes",
                self.max_event_bytes
            )));
        }

        Ok(events)
    }

    fn dispatch(&mut self) -> Option<RawEvent> {
        let event = self.event.take();
        self.data_len = 0;
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(RawEvent {
            event: event.unwrap_or_else(|| "message".to_string()),
            data,
        })
    }
}
