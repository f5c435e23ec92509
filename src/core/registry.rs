//! In-memory directory of live event sinks grouped by room
//!
//! The registry is the only owner of [`Connection`] records. Sessions hold
//! just the [`ConnectionId`] they were given. A room entry exists exactly
//! while it has at least one connection, and any sink that rejects a frame
//! during a broadcast is pruned before the broadcast returns.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, error, trace, warn};
use serde::Serialize;

use crate::core::connection::{Connection, ConnectionId, EventSink};
use crate::core::event::{encode_frame, Frame, StreamEvent};
use crate::error::{Result, RoomcastError};

type RoomConnections = HashMap<ConnectionId, Connection>;

/// Connection registry shared by stream sessions and message producers
pub struct ConnectionRegistry {
    /// Map of room code to its live connections
    rooms: Mutex<HashMap<String, RoomConnections>>,
    next_id: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    // A sink that panicked mid-broadcast leaves the map consistent; keep using it.
    fn rooms(&self) -> MutexGuard<'_, HashMap<String, RoomConnections>> {
        self.rooms.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
            warn!("Connection registry lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Register a sink under a room and return its new id
    pub fn add_connection<S>(&self, room_code: &str, sink: S) -> ConnectionId
    where
        S: EventSink + 'static,
    {
        let id = ConnectionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut rooms = self.rooms();
        let room = rooms.entry(room_code.to_string()).or_default();
        room.insert(id, Connection::new(id, Box::new(sink)));
        debug!(
            "Connection {} joined room {} ({} connected)",
            id,
            room_code,
            room.len()
        );
        id
    }

    /// Remove a connection; unknown rooms and ids are ignored.
    /// Returns whether a connection was actually removed.
    pub fn remove_connection(&self, room_code: &str, id: ConnectionId) -> bool {
        let mut rooms = self.rooms();
        let Some(room) = rooms.get_mut(room_code) else {
            return false;
        };
        let removed = room.remove(&id);
        if let Some(connection) = &removed {
            debug!(
                "Connection {} left room {} after {:?}",
                id,
                room_code,
                connection.connection_duration()
            );
        }
        if room.is_empty() {
            rooms.remove(room_code);
        }
        removed.is_some()
    }

    /// Push a frame to a single connection.
    ///
    /// Fails with `ConnectionClosed` when the connection is no longer
    /// registered. A sink that rejects the frame is removed, as in a broadcast.
    pub fn send_to(&self, room_code: &str, id: ConnectionId, frame: Frame) -> Result<()> {
        let mut rooms = self.rooms();
        let Some(room) = rooms.get_mut(room_code) else {
            return Err(RoomcastError::ConnectionClosed);
        };
        let Some(connection) = room.get(&id) else {
            return Err(RoomcastError::ConnectionClosed);
        };

        if let Err(e) = connection.send(frame) {
            debug!("Dropping connection {} in room {}: {}", id, room_code, e);
            room.remove(&id);
            if room.is_empty() {
                rooms.remove(room_code);
            }
            return Err(e);
        }
        Ok(())
    }

    /// Drop every connection of a room. Their sinks are released, which
    /// ends the matching streams. Returns how many were dropped.
    pub fn close_room(&self, room_code: &str) -> usize {
        let closed = self.rooms().remove(room_code).map_or(0, |room| room.len());
        if closed > 0 {
            debug!("Closed {} connections in room {}", closed, room_code);
        }
        closed
    }

    /// Encode `payload` once and push it to every connection in the room.
    ///
    /// Returns the number of sinks that accepted the frame. Encoding
    /// failures are logged and deliver nothing.
    pub fn broadcast<T>(&self, room_code: &str, event_type: &str, payload: &T) -> usize
    where
        T: Serialize + ?Sized,
    {
        if !self.has_room(room_code) {
            return 0;
        }
        match encode_frame(event_type, payload) {
            Ok(frame) => self.broadcast_frame(room_code, frame),
            Err(e) => {
                error!("Failed to encode {} event for room {}: {}", event_type, room_code, e);
                0
            }
        }
    }

    /// Broadcast a typed event
    pub fn broadcast_event(&self, room_code: &str, event: &StreamEvent) -> usize {
        if !self.has_room(room_code) {
            return 0;
        }
        match event.encode() {
            Ok(frame) => self.broadcast_frame(room_code, frame),
            Err(e) => {
                error!(
                    "Failed to encode {} event for room {}: {}",
                    event.event_type(),
                    room_code,
                    e
                );
                0
            }
        }
    }

    /// Push an already encoded frame to every connection in the room,
    /// pruning the ones whose sink rejected it
    pub fn broadcast_frame(&self, room_code: &str, frame: Frame) -> usize {
        let mut rooms = self.rooms();
        let Some(room) = rooms.get_mut(room_code) else {
            return 0;
        };

        let mut delivered = 0;
        let mut failed = Vec::new();
        for (id, connection) in room.iter() {
            match connection.send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    debug!("Dropping connection {} in room {}: {}", id, room_code, e);
                    failed.push(*id);
                }
            }
        }

        for id in &failed {
            room.remove(id);
        }
        if room.is_empty() {
            rooms.remove(room_code);
        }

        trace!(
            "Broadcast to room {}: {} delivered, {} pruned",
            room_code,
            delivered,
            failed.len()
        );
        delivered
    }

    /// Number of live connections in a room, zero when it has none
    pub fn connection_count(&self, room_code: &str) -> usize {
        self.rooms().get(room_code).map_or(0, |room| room.len())
    }

    /// Admission policy helper for callers enforcing a per-room cap
    pub fn can_admit(&self, room_code: &str, max_per_room: usize) -> bool {
        self.connection_count(room_code) < max_per_room
    }

    /// Number of rooms with at least one connection
    pub fn room_count(&self) -> usize {
        self.rooms().len()
    }

    /// Number of connections across all rooms
    pub fn total_connections(&self) -> usize {
        self.rooms().values().map(|room| room.len()).sum()
    }

    fn has_room(&self, room_code: &str) -> bool {
        self.rooms().contains_key(room_code)
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
