//! Per-subscriber stream lifecycle
//!
//! A [`StreamSession`] moves through `Opening -> Open -> Closing -> Closed`.
//! Opening checks the room against the store, Open registers a channel
//! sink with the [`ConnectionRegistry`] and starts the liveness pulse, and
//! Closing cancels the pulse and deregisters.
//!
//! The registry holds the only sender of a session's channel, so the
//! [`EventStream`] ends exactly when the registry lets go of the
//! connection. Each exit path deregisters once, at its origin:
//!
//! - the subscriber drops or closes its stream: [`StreamSession::close`]
//! - a pulse write fails: the registry prunes the sink in `send_to`
//! - the server signals shutdown: the pulse task removes the connection
//! - the room is deleted: [`ConnectionRegistry::close_room`]
//!
//! In the last three cases the session moves to `Closed` when its stream
//! observes the end.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use chrono::Utc;
use futures_util::Stream;
use log::{debug, error, info};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::core::connection::ConnectionId;
use crate::core::event::{Frame, StreamEvent};
use crate::core::registry::ConnectionRegistry;
use crate::error::{Result, RoomcastError};
use crate::storage::RoomStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Opening,
    Open,
    Closing,
    Closed,
}

/// One subscriber's registration in a room
pub struct StreamSession {
    room_code: String,
    connection_id: Option<ConnectionId>,
    registry: Arc<ConnectionRegistry>,
    pulse: Option<JoinHandle<()>>,
    state: SessionState,
}

impl StreamSession {
    pub fn new(registry: Arc<ConnectionRegistry>, room_code: &str) -> Self {
        Self {
            room_code: room_code.to_string(),
            connection_id: None,
            registry,
            pulse: None,
            state: SessionState::Opening,
        }
    }

    /// Validate the room, register with the registry and start pulsing.
    ///
    /// Fails with `RoomNotFound` or `RoomExpired` before anything is
    /// registered. The returned stream yields the `connected` frame first.
    pub async fn open(
        mut self,
        rooms: &dyn RoomStore,
        ping_interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Result<EventStream> {
        let room = rooms
            .find_room(&self.room_code)
            .await?
            .ok_or(RoomcastError::RoomNotFound)?;
        if room.is_expired(Utc::now()) {
            return Err(RoomcastError::RoomExpired);
        }

        let (tx, rx) = mpsc::unbounded_channel();

        // Queued before registration so it always precedes broadcasts.
        let connected = StreamEvent::connected(&self.room_code).encode()?;
        tx.send(connected)
            .map_err(|_| RoomcastError::ConnectionClosed)?;

        let id = self.registry.add_connection(&self.room_code, tx);
        self.connection_id = Some(id);
        self.state = SessionState::Open;

        self.pulse = Some(tokio::spawn(run_pulse(
            self.registry.clone(),
            self.room_code.clone(),
            id,
            ping_interval,
            shutdown,
        )));

        info!("Stream {} opened for room {}", id, self.room_code);
        Ok(EventStream {
            frames: rx,
            session: self,
        })
    }

    pub fn room_code(&self) -> &str {
        &self.room_code
    }

    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.connection_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Cancel the pulse and deregister. Safe to call more than once.
    pub fn close(&mut self) {
        self.finish(true);
    }

    // `deregister` is false when the registry already released the connection
    fn finish(&mut self, deregister: bool) {
        if self.state == SessionState::Closed {
            return;
        }
        self.state = SessionState::Closing;

        if let Some(pulse) = self.pulse.take() {
            pulse.abort();
        }
        if let Some(id) = self.connection_id {
            if deregister {
                self.registry.remove_connection(&self.room_code, id);
            }
            info!("Stream {} closed for room {}", id, self.room_code);
        }

        self.state = SessionState::Closed;
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// Periodically push a ping frame until the connection is gone or
/// shutdown is signalled. On shutdown the pulse deregisters the connection.
pub(crate) async fn run_pulse(
    registry: Arc<ConnectionRegistry>,
    room_code: String,
    id: ConnectionId,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let already_shutting_down = *shutdown.borrow_and_update();
    if already_shutting_down {
        registry.remove_connection(&room_code, id);
        return;
    }

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let frame = match StreamEvent::ping().encode() {
                    Ok(frame) => frame,
                    Err(e) => {
                        error!("Failed to encode ping for {}: {}", id, e);
                        continue;
                    }
                };
                if let Err(e) = registry.send_to(&room_code, id, frame) {
                    debug!("Ping to {} failed, ending pulse: {}", id, e);
                    return;
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!("Shutdown signalled, ending stream {}", id);
                    registry.remove_connection(&room_code, id);
                    return;
                }
            }
        }
    }
}

/// Frames for one subscriber, in push order.
///
/// Dropping the stream closes its session.
pub struct EventStream {
    frames: mpsc::UnboundedReceiver<Frame>,
    session: StreamSession,
}

impl EventStream {
    pub fn session(&self) -> &StreamSession {
        &self.session
    }

    /// Close the session; already queued frames can still be drained
    pub fn close(&mut self) {
        self.session.close();
        self.frames.close();
    }
}

impl Stream for EventStream {
    type Item = Frame;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Frame>> {
        let this = self.get_mut();
        match this.frames.poll_recv(cx) {
            Poll::Ready(None) => {
                // Every sender is gone, so the registry no longer holds us
                this.session.finish(false);
                Poll::Ready(None)
            }
            other => other,
        }
    }
}
