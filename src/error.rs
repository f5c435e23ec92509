use std::error::Error;
use std::fmt;
use std::sync::PoisonError;

use warp::http::StatusCode;

#[derive(Debug)]
pub enum RoomcastError {
    // Room errors
    RoomNotFound,
    RoomExpired,
    InvalidRoomCode,
    RoomFull,
    RoomCodeExhausted,

    // Message errors
    ContentEmpty,
    ContentTooLong(usize),

    // Request policy errors
    RateLimitExceeded,
    ShuttingDown,
    Unauthorized,

    // Connection errors
    ConnectionClosed,
    StreamError(String),
    RetriesExhausted(u32),

    // Storage errors
    StorageError(String),

    // Serialization errors
    SerializationError(String),

    // Configuration errors
    ConfigError(String),
}

impl RoomcastError {
    /// Stable error code reported in API error bodies
    pub fn code(&self) -> &'static str {
        match self {
            Self::RoomNotFound => "ROOM_NOT_FOUND",
            Self::RoomExpired => "ROOM_EXPIRED",
            Self::InvalidRoomCode => "INVALID_ROOM_CODE",
            Self::RoomFull => "ROOM_FULL",
            Self::ContentEmpty => "CONTENT_EMPTY",
            Self::ContentTooLong(_) => "CONTENT_TOO_LONG",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::ShuttingDown => "SHUTTING_DOWN",
            Self::Unauthorized => "UNAUTHORIZED",
            _ => "INTERNAL_ERROR",
        }
    }

    /// HTTP status used when this error reaches a route handler
    pub fn status(&self) -> StatusCode {
        match self {
            Self::RoomNotFound => StatusCode::NOT_FOUND,
            Self::RoomExpired => StatusCode::GONE,
            Self::InvalidRoomCode | Self::ContentEmpty | Self::ContentTooLong(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::RoomFull | Self::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            Self::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for RoomcastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RoomNotFound => write!(f, "Room not found"),
            Self::RoomExpired => write!(f, "Room has expired"),
            Self::InvalidRoomCode => write!(f, "Invalid room code"),
            Self::RoomFull => write!(f, "Room has reached its connection limit"),
            Self::RoomCodeExhausted => write!(f, "Could not allocate a free room code"),
            Self::ContentEmpty => write!(f, "Message content is empty"),
            Self::ContentTooLong(max) => {
                write!(f, "Message content exceeds {} characters", max)
            }
            Self::RateLimitExceeded => write!(f, "Too many requests, retry later"),
            Self::ShuttingDown => write!(f, "Server is shutting down"),
            Self::Unauthorized => write!(f, "Missing or invalid credentials"),
            Self::ConnectionClosed => write!(f, "Connection closed"),
            Self::StreamError(msg) => write!(f, "Stream error: {}", msg),
            Self::RetriesExhausted(attempts) => {
                write!(f, "Gave up reconnecting after {} attempts", attempts)
            }
            Self::StorageError(msg) => write!(f, "Storage error: {}", msg),
            Self::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl Error for RoomcastError {}

impl From<serde_json::Error> for RoomcastError {
    fn from(err: serde_json::Error) -> Self {
        RoomcastError::SerializationError(err.to_string())
    }
}

// Converting from PoisonError to facilitate poisoned mutex handling
impl<T> From<PoisonError<T>> for RoomcastError {
    fn from(err: PoisonError<T>) -> Self {
        RoomcastError::StorageError(format!("Mutex poisoned: {}", err))
    }
}

impl From<reqwest::Error> for RoomcastError {
    fn from(err: reqwest::Error) -> Self {
        RoomcastError::StreamError(err.to_string())
    }
}

// Generic result type for Roomcast
pub type Result<T> = std::result::Result<T, RoomcastError>;
