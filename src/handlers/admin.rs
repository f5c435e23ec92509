//! Admin and maintenance routes, guarded by bearer tokens

use std::convert::Infallible;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use warp::http::StatusCode;
use warp::reply::Response;

use crate::core::admin::{
    AdminStats, RoomListQuery, RoomListing, RoomSort, RoomStatus, SortOrder,
};
use crate::core::event::{format_timestamp, MessagePayload};
use crate::core::ServerManager;
use crate::handlers::response::{failure, success};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DailyStatData {
    date: String,
    rooms: usize,
    messages: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsData {
    active_rooms: usize,
    total_messages: usize,
    rooms_created_today: usize,
    messages_created_today: usize,
    open_streams: usize,
    streaming_rooms: usize,
    daily_stats: Vec<DailyStatData>,
}

impl From<AdminStats> for StatsData {
    fn from(stats: AdminStats) -> Self {
        Self {
            active_rooms: stats.active_rooms,
            total_messages: stats.total_messages,
            rooms_created_today: stats.rooms_created_today,
            messages_created_today: stats.messages_created_today,
            open_streams: stats.open_streams,
            streaming_rooms: stats.streaming_rooms,
            daily_stats: stats
                .daily
                .into_iter()
                .map(|day| DailyStatData {
                    date: day.date.format("%Y-%m-%d").to_string(),
                    rooms: day.rooms,
                    messages: day.messages,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AdminRoom {
    id: String,
    code: String,
    created_at: String,
    expires_at: String,
    message_count: usize,
    connection_count: usize,
    is_expired: bool,
}

impl From<RoomListing> for AdminRoom {
    fn from(listing: RoomListing) -> Self {
        Self {
            id: listing.room.id,
            code: listing.room.code,
            created_at: format_timestamp(listing.room.created_at),
            expires_at: format_timestamp(listing.room.expires_at),
            message_count: listing.message_count,
            connection_count: listing.connection_count,
            is_expired: listing.is_expired,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RoomList {
    rooms: Vec<AdminRoom>,
    total: usize,
    page: usize,
    page_size: usize,
}

#[derive(Debug, Serialize)]
struct AdminRoomDetail {
    #[serde(flatten)]
    room: AdminRoom,
    messages: Vec<MessagePayload>,
}

#[derive(Debug, Serialize)]
struct RoomDetailData {
    room: AdminRoomDetail,
}

#[derive(Debug, Serialize)]
struct DeletedRoom {
    deleted: bool,
    code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CleanupResult {
    deleted_rooms: usize,
    executed_at: String,
}

/// Raw query of the admin room list; anything unparsable falls back to defaults
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomsQuery {
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl RoomsQuery {
    pub fn to_query(&self) -> RoomListQuery {
        let defaults = RoomListQuery::default();
        let number = |raw: &Option<String>, default: usize| {
            raw.as_deref()
                .and_then(|value| value.trim().parse::<i64>().ok())
                .map_or(default, |n| n.max(1) as usize)
        };

        RoomListQuery {
            page: number(&self.page, defaults.page),
            page_size: number(&self.page_size, defaults.page_size),
            search: self
                .search
                .as_deref()
                .map(str::trim)
                .filter(|search| !search.is_empty())
                .map(str::to_string),
            status: match self.status.as_deref() {
                Some("active") => RoomStatus::Active,
                Some("expired") => RoomStatus::Expired,
                _ => defaults.status,
            },
            sort_by: match self.sort_by.as_deref() {
                Some("expiresAt") => RoomSort::ExpiresAt,
                Some("messageCount") => RoomSort::MessageCount,
                Some("createdAt") => RoomSort::CreatedAt,
                _ => defaults.sort_by,
            },
            sort_order: match self.sort_order.as_deref() {
                Some("asc") => SortOrder::Asc,
                Some("desc") => SortOrder::Desc,
                _ => defaults.sort_order,
            },
        }
        .normalized()
    }
}

// GET /api/admin/stats
pub async fn stats(
    authorization: Option<String>,
    manager: Arc<ServerManager>,
) -> Result<Response, Infallible> {
    if let Err(e) = manager.authorize_admin(authorization.as_deref()) {
        return Ok(failure(&e));
    }

    match manager.admin_stats().await {
        Ok(stats) => Ok(success(StatsData::from(stats), StatusCode::OK)),
        Err(e) => Ok(failure(&e)),
    }
}

// GET /api/admin/rooms
pub async fn list_rooms(
    query: RoomsQuery,
    authorization: Option<String>,
    manager: Arc<ServerManager>,
) -> Result<Response, Infallible> {
    if let Err(e) = manager.authorize_admin(authorization.as_deref()) {
        return Ok(failure(&e));
    }

    match manager.list_rooms(&query.to_query()).await {
        Ok(page) => Ok(success(
            RoomList {
                rooms: page.rooms.into_iter().map(AdminRoom::from).collect(),
                total: page.total,
                page: page.page,
                page_size: page.page_size,
            },
            StatusCode::OK,
        )),
        Err(e) => Ok(failure(&e)),
    }
}

// GET /api/admin/rooms/{code}
pub async fn get_room(
    code: String,
    authorization: Option<String>,
    manager: Arc<ServerManager>,
) -> Result<Response, Infallible> {
    if let Err(e) = manager.authorize_admin(authorization.as_deref()) {
        return Ok(failure(&e));
    }

    match manager.room_detail(&code).await {
        Ok(detail) => Ok(success(
            RoomDetailData {
                room: AdminRoomDetail {
                    messages: detail.messages.iter().map(MessagePayload::from).collect(),
                    room: AdminRoom::from(detail.listing),
                },
            },
            StatusCode::OK,
        )),
        Err(e) => Ok(failure(&e)),
    }
}

// DELETE /api/admin/rooms/{code}
pub async fn delete_room(
    code: String,
    authorization: Option<String>,
    manager: Arc<ServerManager>,
) -> Result<Response, Infallible> {
    if let Err(e) = manager.authorize_admin(authorization.as_deref()) {
        return Ok(failure(&e));
    }

    match manager.delete_room(&code).await {
        Ok(code) => Ok(success(DeletedRoom { deleted: true, code }, StatusCode::OK)),
        Err(e) => Ok(failure(&e)),
    }
}

// POST /api/admin/cleanup
pub async fn admin_cleanup(
    authorization: Option<String>,
    manager: Arc<ServerManager>,
) -> Result<Response, Infallible> {
    if let Err(e) = manager.authorize_admin(authorization.as_deref()) {
        return Ok(failure(&e));
    }
    run_cleanup(&manager).await
}

// POST /api/cleanup
pub async fn cleanup(
    authorization: Option<String>,
    manager: Arc<ServerManager>,
) -> Result<Response, Infallible> {
    if let Err(e) = manager.authorize_cleanup(authorization.as_deref()) {
        return Ok(failure(&e));
    }
    run_cleanup(&manager).await
}

async fn run_cleanup(manager: &ServerManager) -> Result<Response, Infallible> {
    match manager.cleanup_expired_rooms().await {
        Ok(deleted_rooms) => Ok(success(
            CleanupResult {
                deleted_rooms,
                executed_at: format_timestamp(Utc::now()),
            },
            StatusCode::OK,
        )),
        Err(e) => Ok(failure(&e)),
    }
}
