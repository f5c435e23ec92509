//! Storage for rooms and their messages

pub mod memory;
pub mod traits;

pub use memory::MemoryRoomStore;
pub use traits::{RoomStore, StoredMessage, StoredRoom};
