//! In-memory storage implementation for development and testing
//!
//! Keeps rooms and their messages in process memory. Everything is lost
//! on restart, which matches the ephemeral nature of rooms.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::traits::*;
use crate::error::{Result, RoomcastError};

/// In-memory room and message storage
pub struct MemoryRoomStore {
    rooms: RwLock<HashMap<String, StoredRoom>>, // code -> room
    messages: RwLock<HashMap<String, Vec<StoredMessage>>>, // room_id -> messages, oldest first
}

impl MemoryRoomStore {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            messages: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryRoomStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoomStore for MemoryRoomStore {
    async fn create_room(
        &self,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<StoredRoom>> {
        let mut rooms = self.rooms.write().await;
        if rooms.contains_key(code) {
            return Ok(None);
        }

        let room = StoredRoom {
            id: Uuid::new_v4().to_string(),
            code: code.to_string(),
            created_at: Utc::now(),
            expires_at,
        };
        rooms.insert(code.to_string(), room.clone());
        Ok(Some(room))
    }

    async fn find_room(&self, code: &str) -> Result<Option<StoredRoom>> {
        Ok(self.rooms.read().await.get(code).cloned())
    }

    async fn create_message(&self, room_id: &str, content: &str) -> Result<StoredMessage> {
        let known = self
            .rooms
            .read()
            .await
            .values()
            .any(|room| room.id == room_id);
        if !known {
            return Err(RoomcastError::StorageError(format!(
                "Unknown room id: {}",
                room_id
            )));
        }

        let message = StoredMessage {
            id: Uuid::new_v4().to_string(),
            room_id: room_id.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
        };

        self.messages
            .write()
            .await
            .entry(room_id.to_string())
            .or_default()
            .push(message.clone());

        Ok(message)
    }

    async fn recent_messages(&self, room_id: &str, limit: usize) -> Result<Vec<StoredMessage>> {
        let messages = self.messages.read().await;
        Ok(messages
            .get(room_id)
            .map(|list| list.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn room_messages(&self, room_id: &str) -> Result<Vec<StoredMessage>> {
        Ok(self
            .messages
            .read()
            .await
            .get(room_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn message_count(&self, room_id: &str) -> Result<usize> {
        Ok(self
            .messages
            .read()
            .await
            .get(room_id)
            .map_or(0, |list| list.len()))
    }

    async fn list_rooms(&self) -> Result<Vec<StoredRoom>> {
        Ok(self.rooms.read().await.values().cloned().collect())
    }

    async fn total_messages(&self) -> Result<usize> {
        Ok(self.messages.read().await.values().map(|list| list.len()).sum())
    }

    async fn messages_created_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<usize> {
        Ok(self
            .messages
            .read()
            .await
            .values()
            .flatten()
            .filter(|message| message.created_at >= from && message.created_at < until)
            .count())
    }

    async fn delete_room(&self, code: &str) -> Result<bool> {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.remove(code) else {
            return Ok(false);
        };
        self.messages.write().await.remove(&room.id);
        Ok(true)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<Vec<String>> {
        let mut rooms = self.rooms.write().await;
        let expired: Vec<StoredRoom> = rooms
            .values()
            .filter(|room| room.is_expired(now))
            .cloned()
            .collect();

        let mut messages = self.messages.write().await;
        for room in &expired {
            rooms.remove(&room.code);
            messages.remove(&room.id);
        }

        Ok(expired.into_iter().map(|room| room.code).collect())
    }
}
