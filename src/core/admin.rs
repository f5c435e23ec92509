//! Admin views over rooms: listings, paging and activity statistics

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::constants::{DEFAULT_ADMIN_PAGE_SIZE, MAX_ADMIN_PAGE_SIZE};
use crate::storage::{StoredMessage, StoredRoom};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoomStatus {
    #[default]
    All,
    Active,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoomSort {
    #[default]
    CreatedAt,
    ExpiresAt,
    MessageCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Filter, sort and page selection for the admin room list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomListQuery {
    /// 1-based page number
    pub page: usize,
    pub page_size: usize,
    /// Case-insensitive substring of the room code
    pub search: Option<String>,
    pub status: RoomStatus,
    pub sort_by: RoomSort,
    pub sort_order: SortOrder,
}

impl Default for RoomListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_ADMIN_PAGE_SIZE,
            search: None,
            status: RoomStatus::All,
            sort_by: RoomSort::CreatedAt,
            sort_order: SortOrder::Desc,
        }
    }
}

impl RoomListQuery {
    /// Clamp page to at least 1 and page size to 1..=MAX_ADMIN_PAGE_SIZE
    pub fn normalized(mut self) -> Self {
        self.page = self.page.max(1);
        self.page_size = self.page_size.clamp(1, MAX_ADMIN_PAGE_SIZE);
        self
    }
}

/// A room with its activity counters
#[derive(Debug, Clone)]
pub struct RoomListing {
    pub room: StoredRoom,
    pub message_count: usize,
    pub connection_count: usize,
    pub is_expired: bool,
}

#[derive(Debug, Clone)]
pub struct RoomPage {
    pub rooms: Vec<RoomListing>,
    /// Rooms matching the filter, across all pages
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

/// A room with its full message log, oldest first
#[derive(Debug, Clone)]
pub struct RoomDetail {
    pub listing: RoomListing,
    pub messages: Vec<StoredMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyStat {
    pub date: NaiveDate,
    pub rooms: usize,
    pub messages: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminStats {
    pub active_rooms: usize,
    pub total_messages: usize,
    pub rooms_created_today: usize,
    pub messages_created_today: usize,
    /// Open event streams across all rooms
    pub open_streams: usize,
    /// Rooms with at least one open stream
    pub streaming_rooms: usize,
    /// One entry per day, oldest first, today last
    pub daily: Vec<DailyStat>,
}

/// Apply filter, sort and paging to a full room listing
pub fn page_rooms(mut rooms: Vec<RoomListing>, query: &RoomListQuery) -> RoomPage {
    let query = query.clone().normalized();

    if let Some(search) = query.search.as_deref().map(str::to_uppercase) {
        rooms.retain(|listing| listing.room.code.contains(&search));
    }
    match query.status {
        RoomStatus::All => {}
        RoomStatus::Active => rooms.retain(|listing| !listing.is_expired),
        RoomStatus::Expired => rooms.retain(|listing| listing.is_expired),
    }

    rooms.sort_by(|a, b| {
        let ordering = match query.sort_by {
            RoomSort::CreatedAt => a.room.created_at.cmp(&b.room.created_at),
            RoomSort::ExpiresAt => a.room.expires_at.cmp(&b.room.expires_at),
            RoomSort::MessageCount => a.message_count.cmp(&b.message_count),
        }
        .then_with(|| a.room.code.cmp(&b.room.code));
        match query.sort_order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });

    let total = rooms.len();
    let rooms = rooms
        .into_iter()
        .skip((query.page - 1).saturating_mul(query.page_size))
        .take(query.page_size)
        .collect();

    RoomPage {
        rooms,
        total,
        page: query.page,
        page_size: query.page_size,
    }
}

/// UTC midnight starting the day `now` falls in
pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_hms_opt(0, 0, 0).map_or(now, |t| t.and_utc())
}

/// `[start, end)` of each of the last `days` UTC days, oldest first
pub fn day_ranges(now: DateTime<Utc>, days: u32) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    let today = start_of_day(now);
    (0..i64::from(days))
        .rev()
        .map(|back| {
            let start = today - Duration::days(back);
            (start, start + Duration::days(1))
        })
        .collect()
}

/// Count rooms created in `[from, until)`
pub fn rooms_created_between(
    rooms: &[StoredRoom],
    from: DateTime<Utc>,
    until: DateTime<Utc>,
) -> usize {
    rooms
        .iter()
        .filter(|room| room.created_at >= from && room.created_at < until)
        .count()
}
