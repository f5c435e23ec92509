//! Abstract storage interfaces for pluggable backends
//!
//! The streaming core only ever asks one question of this layer (does this
//! room exist and is it still live), the HTTP routes use the rest.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Room data for persistence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRoom {
    pub id: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl StoredRoom {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// A message posted to a room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: String,
    pub room_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Room and message storage interface
#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Create a room under `code`; returns `None` when the code is taken
    async fn create_room(
        &self,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<StoredRoom>>;

    /// Look a room up by its code, expired rooms included
    async fn find_room(&self, code: &str) -> Result<Option<StoredRoom>>;

    /// Persist a new message in a room
    async fn create_message(&self, room_id: &str, content: &str) -> Result<StoredMessage>;

    /// Most recent messages of a room, newest first
    async fn recent_messages(&self, room_id: &str, limit: usize) -> Result<Vec<StoredMessage>>;

    /// Every message of a room, oldest first
    async fn room_messages(&self, room_id: &str) -> Result<Vec<StoredMessage>>;

    /// Get message count for a room
    async fn message_count(&self, room_id: &str) -> Result<usize>;

    /// Every stored room, expired ones included, in no particular order
    async fn list_rooms(&self) -> Result<Vec<StoredRoom>>;

    /// Messages across all rooms
    async fn total_messages(&self) -> Result<usize>;

    /// Messages across all rooms created in `[from, until)`
    async fn messages_created_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<usize>;

    /// Delete a room and its messages; returns false when it did not exist
    async fn delete_room(&self, code: &str) -> Result<bool>;

    /// Delete rooms that expired before `now`, with their messages.
    /// Returns the codes of the deleted rooms.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<Vec<String>>;
}
