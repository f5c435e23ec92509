//! Event-stream wire envelope
//!
//! Every event pushed to a subscriber is a single text frame:
//! `event: <type>\ndata: <json>\n\n`. Frames are encoded once and shared
//! by reference between all recipients of a broadcast.

use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RoomcastError};
use crate::storage::StoredMessage;

pub const EVENT_CONNECTED: &str = "connected";
pub const EVENT_MESSAGE: &str = "message";
pub const EVENT_PING: &str = "ping";

/// One encoded frame, cheap to clone
pub type Frame = Bytes;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedPayload {
    pub room_code: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    pub id: String,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingPayload {
    pub timestamp: i64,
}

impl From<&StoredMessage> for MessagePayload {
    fn from(message: &StoredMessage) -> Self {
        Self {
            id: message.id.clone(),
            content: message.content.clone(),
            created_at: format_timestamp(message.created_at),
        }
    }
}

/// Events a subscriber can receive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Connected(ConnectedPayload),
    Message(MessagePayload),
    Ping(PingPayload),
}

impl StreamEvent {
    pub fn connected(room_code: &str) -> Self {
        StreamEvent::Connected(ConnectedPayload {
            room_code: room_code.to_string(),
            timestamp: Utc::now().timestamp_millis(),
        })
    }

    pub fn ping() -> Self {
        StreamEvent::Ping(PingPayload {
            timestamp: Utc::now().timestamp_millis(),
        })
    }

    pub fn message(message: &StoredMessage) -> Self {
        StreamEvent::Message(MessagePayload::from(message))
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            StreamEvent::Connected(_) => EVENT_CONNECTED,
            StreamEvent::Message(_) => EVENT_MESSAGE,
            StreamEvent::Ping(_) => EVENT_PING,
        }
    }

    pub fn encode(&self) -> Result<Frame> {
        match self {
            StreamEvent::Connected(payload) => encode_frame(self.event_type(), payload),
            StreamEvent::Message(payload) => encode_frame(self.event_type(), payload),
            StreamEvent::Ping(payload) => encode_frame(self.event_type(), payload),
        }
    }

    /// Rebuild a typed event from a received `event`/`data` pair
    pub fn decode(event_type: &str, data: &str) -> Result<Self> {
        match event_type {
            EVENT_CONNECTED => Ok(StreamEvent::Connected(serde_json::from_str(data)?)),
            EVENT_MESSAGE => Ok(StreamEvent::Message(serde_json::from_str(data)?)),
            EVENT_PING => Ok(StreamEvent::Ping(serde_json::from_str(data)?)),
            other => Err(RoomcastError::StreamError(format!(
                "Unknown event type: {}",
                other
            ))),
        }
    }
}

/// Encode an event type and JSON payload into one frame
pub fn encode_frame<T: Serialize + ?Sized>(event_type: &str, payload: &T) -> Result<Frame> {
    let data = serde_json::to_string(payload)?;
    Ok(Bytes::from(format!("event: {}\ndata: {}\n\n", event_type, data)))
}

/// ISO-8601 with millisecond precision, the format clients receive for `createdAt`
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
