//! Subscriber connection records
//! A connection pairs a registry-assigned id with the sink frames are pushed into

use std::fmt;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use crate::core::event::Frame;
use crate::error::{Result, RoomcastError};

/// Process-unique connection identifier, never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn_{}", self.0)
    }
}

/// Write side of one subscriber's output channel.
///
/// `send` must not block: a frame accepted for delivery is a success, a
/// rejected frame means the subscriber is gone.
pub trait EventSink: Send + Sync {
    fn send(&self, frame: Frame) -> Result<()>;
}

impl EventSink for mpsc::UnboundedSender<Frame> {
    fn send(&self, frame: Frame) -> Result<()> {
        mpsc::UnboundedSender::send(self, frame).map_err(|_| RoomcastError::ConnectionClosed)
    }
}

/// Represents one live subscriber of one room
pub struct Connection {
    pub id: ConnectionId,
    sink: Box<dyn EventSink>,
    pub connected_at: Instant,
}

impl Connection {
    pub fn new(id: ConnectionId, sink: Box<dyn EventSink>) -> Self {
        Self {
            id,
            sink,
            connected_at: Instant::now(),
        }
    }

    /// Push a frame through this connection's sink
    pub fn send(&self, frame: Frame) -> Result<()> {
        self.sink.send(frame)
    }

    /// Calculate the connection duration
    pub fn connection_duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("connected_at", &self.connected_at)
            .finish()
    }
}
