//! Roomcast - ephemeral rooms with real-time message fan-out
//!
//! Rooms are identified by a short code. Subscribers hold a server-sent
//! event stream open per room, and every message posted to the room is
//! pushed to all of the room's open streams.

pub mod client;
pub mod config;
pub mod constants;
pub mod core;
pub mod error;
pub mod handlers;
pub mod storage;

// Re-export main components
pub use config::*;
pub use constants::*;
