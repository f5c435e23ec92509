//! Server configuration module
//! Handles dynamic configuration parameters for the room server

use crate::constants::{
    DEFAULT_CLEANUP_INTERVAL_SECS, DEFAULT_HOST, DEFAULT_MAX_CONNECTIONS_PER_ROOM,
    DEFAULT_MAX_MESSAGE_LENGTH, DEFAULT_PING_INTERVAL_SECS, DEFAULT_PORT,
    DEFAULT_RATE_LIMIT_PER_MINUTE, DEFAULT_ROOM_TTL_HOURS,
};
use crate::error::{Result, RoomcastError};
use chrono::Duration as RoomTtl;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Server configuration parameters
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Interval between liveness pulses on every open stream
    pub ping_interval: Duration,
    /// Admission cap per room, `None` when the check is disabled
    pub max_connections_per_room: Option<usize>,
    /// Lifetime of a newly created room
    pub room_ttl: RoomTtl,
    /// Maximum message length, in characters
    pub max_message_length: usize,
    /// Requests per minute per client on write routes, `None` when disabled
    pub rate_limit_per_minute: Option<u32>,
    /// How often expired rooms are purged
    pub cleanup_interval: Duration,
    /// Bearer token for the admin routes; they refuse every request when unset
    pub admin_token: Option<String>,
    /// Bearer token accepted by the external cleanup trigger
    pub cron_secret: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            ping_interval: Duration::from_secs(DEFAULT_PING_INTERVAL_SECS),
            max_connections_per_room: Some(DEFAULT_MAX_CONNECTIONS_PER_ROOM),
            room_ttl: RoomTtl::hours(DEFAULT_ROOM_TTL_HOURS),
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
            rate_limit_per_minute: Some(DEFAULT_RATE_LIMIT_PER_MINUTE),
            cleanup_interval: Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECS),
            admin_token: None,
            cron_secret: None,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_secret(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ServerConfig {
    /// Load configuration from environment variables if available
    pub fn from_env() -> Result<Self> {
        let host = env::var("ROOMCAST_HOST").unwrap_or(DEFAULT_HOST.to_string());
        let port = env_or("ROOMCAST_PORT", DEFAULT_PORT);

        let ping_secs = env_or("ROOMCAST_PING_INTERVAL_SECS", DEFAULT_PING_INTERVAL_SECS);
        let max_per_room = env_or(
            "ROOMCAST_MAX_CONNECTIONS_PER_ROOM",
            DEFAULT_MAX_CONNECTIONS_PER_ROOM,
        );
        let ttl_hours = env_or("ROOMCAST_ROOM_TTL_HOURS", DEFAULT_ROOM_TTL_HOURS);
        let max_message_length =
            env_or("ROOMCAST_MAX_MESSAGE_LENGTH", DEFAULT_MAX_MESSAGE_LENGTH);
        let rate_limit = env_or("ROOMCAST_RATE_LIMIT_PER_MINUTE", DEFAULT_RATE_LIMIT_PER_MINUTE);
        let cleanup_secs = env_or("ROOMCAST_CLEANUP_INTERVAL_SECS", DEFAULT_CLEANUP_INTERVAL_SECS);

        if ping_secs == 0 {
            return Err(RoomcastError::ConfigError(
                "ROOMCAST_PING_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }
        if cleanup_secs == 0 {
            return Err(RoomcastError::ConfigError(
                "ROOMCAST_CLEANUP_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }
        if ttl_hours <= 0 {
            return Err(RoomcastError::ConfigError(
                "ROOMCAST_ROOM_TTL_HOURS must be greater than zero".to_string(),
            ));
        }
        if max_message_length == 0 {
            return Err(RoomcastError::ConfigError(
                "ROOMCAST_MAX_MESSAGE_LENGTH must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            host,
            port,
            ping_interval: Duration::from_secs(ping_secs),
            max_connections_per_room: (max_per_room > 0).then_some(max_per_room),
            room_ttl: RoomTtl::hours(ttl_hours),
            max_message_length,
            rate_limit_per_minute: (rate_limit > 0).then_some(rate_limit),
            cleanup_interval: Duration::from_secs(cleanup_secs),
            admin_token: env_secret("ROOMCAST_ADMIN_TOKEN"),
            cron_secret: env_secret("ROOMCAST_CRON_SECRET"),
        })
    }
}
