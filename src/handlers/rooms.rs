//! Room and message routes

use std::convert::Infallible;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use warp::http::StatusCode;
use warp::reply::Response;

use crate::constants::{DEFAULT_MESSAGE_LIMIT, MAX_MESSAGE_LIMIT};
use crate::core::event::{format_timestamp, MessagePayload};
use crate::core::ServerManager;
use crate::handlers::response::{failure, success};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatedRoom {
    code: String,
    expires_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RoomDetails {
    id: String,
    code: String,
    created_at: String,
    expires_at: String,
    message_count: usize,
    connection_count: usize,
}

#[derive(Debug, Serialize)]
struct RoomData<T> {
    room: T,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MessageList {
    messages: Vec<MessagePayload>,
    has_more: bool,
}

#[derive(Debug, Serialize)]
struct MessageData {
    message: MessagePayload,
}

/// Query of the message listing route
#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub limit: Option<String>,
}

impl MessageQuery {
    /// Parsed limit clamped to 1..=MAX_MESSAGE_LIMIT; unparsable falls back to the default
    pub fn limit(&self) -> usize {
        self.limit
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .map(|n| n.clamp(1, MAX_MESSAGE_LIMIT as i64) as usize)
            .unwrap_or(DEFAULT_MESSAGE_LIMIT)
    }
}

#[derive(Debug, Deserialize)]
pub struct NewMessage {
    #[serde(default)]
    pub content: String,
}

// POST /api/rooms
pub async fn create_room(
    client: String,
    manager: Arc<ServerManager>,
) -> Result<Response, Infallible> {
    if let Err(e) = manager.check_rate_limit(&client).await {
        return Ok(failure(&e));
    }

    match manager.create_room().await {
        Ok(room) => Ok(success(
            RoomData {
                room: CreatedRoom {
                    code: room.code,
                    expires_at: format_timestamp(room.expires_at),
                },
            },
            StatusCode::CREATED,
        )),
        Err(e) => Ok(failure(&e)),
    }
}

// GET /api/rooms/{code}
pub async fn get_room(code: String, manager: Arc<ServerManager>) -> Result<Response, Infallible> {
    match manager.room_summary(&code).await {
        Ok(summary) => Ok(success(
            RoomData {
                room: RoomDetails {
                    id: summary.room.id,
                    code: summary.room.code,
                    created_at: format_timestamp(summary.room.created_at),
                    expires_at: format_timestamp(summary.room.expires_at),
                    message_count: summary.message_count,
                    connection_count: summary.connection_count,
                },
            },
            StatusCode::OK,
        )),
        Err(e) => Ok(failure(&e)),
    }
}

// GET /api/rooms/{code}/messages?limit=n
pub async fn list_messages(
    code: String,
    query: MessageQuery,
    manager: Arc<ServerManager>,
) -> Result<Response, Infallible> {
    match manager.list_messages(&code, query.limit()).await {
        Ok(page) => Ok(success(
            MessageList {
                messages: page.messages.iter().map(MessagePayload::from).collect(),
                has_more: page.has_more,
            },
            StatusCode::OK,
        )),
        Err(e) => Ok(failure(&e)),
    }
}

// POST /api/rooms/{code}/messages
pub async fn post_message(
    code: String,
    client: String,
    body: NewMessage,
    manager: Arc<ServerManager>,
) -> Result<Response, Infallible> {
    if let Err(e) = manager.check_rate_limit(&client).await {
        return Ok(failure(&e));
    }

    match manager.post_message(&code, &body.content).await {
        Ok(message) => Ok(success(
            MessageData {
                message: MessagePayload::from(&message),
            },
            StatusCode::CREATED,
        )),
        Err(e) => Ok(failure(&e)),
    }
}
