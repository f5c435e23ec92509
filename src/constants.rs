// Fundamental configuration constants
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3030;
pub const API_PATH: &str = "api";
pub const ROOMS_PATH: &str = "rooms";
pub const MESSAGES_PATH: &str = "messages";
pub const SSE_PATH: &str = "sse";
pub const ADMIN_PATH: &str = "admin";
pub const STATS_PATH: &str = "stats";
pub const CLEANUP_PATH: &str = "cleanup";

// Stream lifecycle
pub const DEFAULT_PING_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_MAX_CONNECTIONS_PER_ROOM: usize = 100;

// Rooms and messages
pub const ROOM_CODE_LENGTH: usize = 6;
/// Room code alphabet, without the easily confused 0, O, 1, I and L
pub const ROOM_CODE_ALPHABET: &str = "ABCDEFGHJKMNPQRSTUVWXYZ23456789";
pub const DEFAULT_ROOM_TTL_HOURS: i64 = 24;
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 10_000;
pub const DEFAULT_MESSAGE_LIMIT: usize = 50;
pub const MAX_MESSAGE_LIMIT: usize = 100;

// Background maintenance
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 3600;
pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 30;

// Admin API
pub const DEFAULT_ADMIN_PAGE_SIZE: usize = 20;
pub const MAX_ADMIN_PAGE_SIZE: usize = 100;
pub const DAILY_STATS_DAYS: u32 = 7;
