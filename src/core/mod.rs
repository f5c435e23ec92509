//! Core functionality for the room server

pub mod access;
pub mod admin;
pub mod backoff;
pub mod connection;
pub mod event;
pub mod rate_limiter;
pub mod registry;
pub mod room_code;
pub mod server;
pub mod session;

// Re-export main components for convenience
pub use admin::{AdminStats, RoomListQuery, RoomPage, RoomSort, RoomStatus, SortOrder};
pub use backoff::{Backoff, ReconnectPolicy};
pub use connection::{Connection, ConnectionId, EventSink};
pub use event::{encode_frame, Frame, StreamEvent};
pub use registry::ConnectionRegistry;
pub use server::ServerManager;
pub use session::{EventStream, SessionState, StreamSession};
