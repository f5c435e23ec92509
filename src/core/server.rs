//! Integrated server service that coordinates rooms, messages and streams

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Duration as DayDuration, Utc};
use log::{debug, info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::interval;

use crate::config::ServerConfig;
use crate::constants::DAILY_STATS_DAYS;
use crate::core::access::is_authorized;
use crate::core::admin::{
    day_ranges, page_rooms, rooms_created_between, start_of_day, AdminStats, DailyStat,
    RoomDetail, RoomListQuery, RoomListing, RoomPage,
};
use crate::core::event::StreamEvent;
use crate::core::rate_limiter::RequestRateLimiter;
use crate::core::registry::ConnectionRegistry;
use crate::core::room_code::{generate_room_code, normalize_room_code};
use crate::core::session::{EventStream, StreamSession};
use crate::error::{Result, RoomcastError};
use crate::storage::{MemoryRoomStore, RoomStore, StoredMessage, StoredRoom};

/// Attempts at finding an unused room code before giving up
const ROOM_CODE_ATTEMPTS: usize = 5;

/// Room details together with live activity
#[derive(Debug, Clone)]
pub struct RoomSummary {
    pub room: StoredRoom,
    pub message_count: usize,
    pub connection_count: usize,
}

/// One page of messages, newest first
#[derive(Debug, Clone)]
pub struct MessagePage {
    pub messages: Vec<StoredMessage>,
    pub has_more: bool,
}

/// Application context shared by every route.
///
/// Built once at startup and handed to the handlers; tests build their own.
pub struct ServerManager {
    config: ServerConfig,
    registry: Arc<ConnectionRegistry>,
    rooms: Arc<dyn RoomStore>,
    rate_limiter: Option<Arc<RequestRateLimiter>>,
    shutdown: watch::Sender<bool>,
}

impl ServerManager {
    /// Create a server manager backed by in-memory storage
    pub fn new(config: ServerConfig) -> Self {
        Self::with_store(config, Arc::new(MemoryRoomStore::new()))
    }

    /// Create with a specific room store
    pub fn with_store(config: ServerConfig, rooms: Arc<dyn RoomStore>) -> Self {
        let rate_limiter = config
            .rate_limit_per_minute
            .map(|limit| Arc::new(RequestRateLimiter::per_minute(limit)));
        let (shutdown, _) = watch::channel(false);

        Self {
            config,
            registry: Arc::new(ConnectionRegistry::new()),
            rooms,
            rate_limiter,
            shutdown,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Create a room with a fresh code and the configured lifetime
    pub async fn create_room(&self) -> Result<StoredRoom> {
        let expires_at = Utc::now() + self.config.room_ttl;
        for _ in 0..ROOM_CODE_ATTEMPTS {
            let code = generate_room_code(&mut rand::thread_rng());
            if let Some(room) = self.rooms.create_room(&code, expires_at).await? {
                info!("Room {} created, expires at {}", room.code, room.expires_at);
                return Ok(room);
            }
            debug!("Room code {} already taken, retrying", code);
        }
        Err(RoomcastError::RoomCodeExhausted)
    }

    /// Look up a live room by user supplied code
    pub async fn find_live_room(&self, raw_code: &str) -> Result<StoredRoom> {
        let code = normalize_room_code(raw_code)?;
        let room = self
            .rooms
            .find_room(&code)
            .await?
            .ok_or(RoomcastError::RoomNotFound)?;
        if room.is_expired(Utc::now()) {
            return Err(RoomcastError::RoomExpired);
        }
        Ok(room)
    }

    pub async fn room_summary(&self, raw_code: &str) -> Result<RoomSummary> {
        let room = self.find_live_room(raw_code).await?;
        let message_count = self.rooms.message_count(&room.id).await?;
        let connection_count = self.registry.connection_count(&room.code);
        Ok(RoomSummary {
            room,
            message_count,
            connection_count,
        })
    }

    pub async fn list_messages(&self, raw_code: &str, limit: usize) -> Result<MessagePage> {
        let room = self.find_live_room(raw_code).await?;
        let mut messages = self.rooms.recent_messages(&room.id, limit + 1).await?;
        let has_more = messages.len() > limit;
        messages.truncate(limit);
        Ok(MessagePage { messages, has_more })
    }

    /// Persist a message and fan it out to the room's open streams.
    ///
    /// The broadcast cannot fail the call; it only reports how many
    /// subscribers accepted the frame.
    pub async fn post_message(&self, raw_code: &str, content: &str) -> Result<StoredMessage> {
        if content.trim().is_empty() {
            return Err(RoomcastError::ContentEmpty);
        }
        if content.chars().count() > self.config.max_message_length {
            return Err(RoomcastError::ContentTooLong(self.config.max_message_length));
        }

        let room = self.find_live_room(raw_code).await?;
        let message = self.rooms.create_message(&room.id, content).await?;

        let delivered = self
            .registry
            .broadcast_event(&room.code, &StreamEvent::message(&message));
        debug!(
            "Message {} in room {} delivered to {} streams",
            message.id, room.code, delivered
        );
        Ok(message)
    }

    /// Admission check followed by a new stream session
    pub async fn open_stream(&self, raw_code: &str) -> Result<EventStream> {
        let code = normalize_room_code(raw_code)?;
        if *self.shutdown.borrow() {
            return Err(RoomcastError::ShuttingDown);
        }
        if let Some(max) = self.config.max_connections_per_room {
            if !self.registry.can_admit(&code, max) {
                warn!("Room {} is at its limit of {} streams", code, max);
                return Err(RoomcastError::RoomFull);
            }
        }

        StreamSession::new(self.registry.clone(), &code)
            .open(
                self.rooms.as_ref(),
                self.config.ping_interval,
                self.shutdown.subscribe(),
            )
            .await
    }

    /// Count a write request against the client's rate limit
    pub async fn check_rate_limit(&self, client: &str) -> Result<()> {
        let Some(limiter) = &self.rate_limiter else {
            return Ok(());
        };
        let decision = limiter.check_and_record(client).await;
        if decision.allowed {
            Ok(())
        } else {
            debug!("Rate limit hit for {}, resets in {:?}", client, decision.reset_in);
            Err(RoomcastError::RateLimitExceeded)
        }
    }

    /// Delete expired rooms and end their open streams; returns how many
    /// rooms were removed
    pub async fn cleanup_expired_rooms(&self) -> Result<usize> {
        let deleted = self.rooms.delete_expired(Utc::now()).await?;
        for code in &deleted {
            let closed = self.registry.close_room(code);
            info!("Deleted expired room {} ({} streams closed)", code, closed);
        }
        Ok(deleted.len())
    }

    /// Check an admin route's `Authorization` header
    pub fn authorize_admin(&self, authorization: Option<&str>) -> Result<()> {
        if is_authorized(authorization, &[self.config.admin_token.as_deref()]) {
            Ok(())
        } else {
            Err(RoomcastError::Unauthorized)
        }
    }

    /// The cleanup trigger accepts the cron secret or the admin token
    pub fn authorize_cleanup(&self, authorization: Option<&str>) -> Result<()> {
        let accepted = [
            self.config.cron_secret.as_deref(),
            self.config.admin_token.as_deref(),
        ];
        if is_authorized(authorization, &accepted) {
            Ok(())
        } else {
            Err(RoomcastError::Unauthorized)
        }
    }

    /// Totals for the admin dashboard
    pub async fn admin_stats(&self) -> Result<AdminStats> {
        let now = Utc::now();
        let rooms = self.rooms.list_rooms().await?;
        let today = start_of_day(now);
        let tomorrow = today + DayDuration::days(1);

        let mut daily = Vec::new();
        for (from, until) in day_ranges(now, DAILY_STATS_DAYS) {
            daily.push(DailyStat {
                date: from.date_naive(),
                rooms: rooms_created_between(&rooms, from, until),
                messages: self.rooms.messages_created_between(from, until).await?,
            });
        }

        Ok(AdminStats {
            active_rooms: rooms.iter().filter(|room| !room.is_expired(now)).count(),
            total_messages: self.rooms.total_messages().await?,
            rooms_created_today: rooms_created_between(&rooms, today, tomorrow),
            messages_created_today: self.rooms.messages_created_between(today, tomorrow).await?,
            open_streams: self.registry.total_connections(),
            streaming_rooms: self.registry.room_count(),
            daily,
        })
    }

    async fn listing(&self, room: StoredRoom, now: DateTime<Utc>) -> Result<RoomListing> {
        let message_count = self.rooms.message_count(&room.id).await?;
        Ok(RoomListing {
            connection_count: self.registry.connection_count(&room.code),
            is_expired: room.is_expired(now),
            message_count,
            room,
        })
    }

    /// Filtered, sorted page of every room, expired ones included
    pub async fn list_rooms(&self, query: &RoomListQuery) -> Result<RoomPage> {
        let now = Utc::now();
        let mut listings = Vec::new();
        for room in self.rooms.list_rooms().await? {
            listings.push(self.listing(room, now).await?);
        }
        Ok(page_rooms(listings, query))
    }

    /// A room and its whole message log; expired rooms are still visible
    pub async fn room_detail(&self, raw_code: &str) -> Result<RoomDetail> {
        let code = normalize_room_code(raw_code)?;
        let room = self
            .rooms
            .find_room(&code)
            .await?
            .ok_or(RoomcastError::RoomNotFound)?;
        let messages = self.rooms.room_messages(&room.id).await?;
        Ok(RoomDetail {
            listing: self.listing(room, Utc::now()).await?,
            messages,
        })
    }

    /// Delete a room with its messages and end its open streams.
    /// Returns the normalized code.
    pub async fn delete_room(&self, raw_code: &str) -> Result<String> {
        let code = normalize_room_code(raw_code)?;
        if !self.rooms.delete_room(&code).await? {
            return Err(RoomcastError::RoomNotFound);
        }
        let closed = self.registry.close_room(&code);
        info!("Deleted room {} ({} streams closed)", code, closed);
        Ok(code)
    }

    /// Start background maintenance: expired rooms and rate limiter windows
    pub fn start_cleanup_task(self: Arc<Self>) -> JoinHandle<()> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.clone().start_cleanup_task();
        }

        let cleanup_interval: Duration = self.config.cleanup_interval;
        tokio::spawn(async move {
            let mut ticker = interval(cleanup_interval);
            loop {
                ticker.tick().await;
                if let Err(e) = self.cleanup_expired_rooms().await {
                    log::error!("Failed to cleanup expired rooms: {}", e);
                }
            }
        })
    }

    /// Ask every open stream to close
    pub fn shutdown(&self) {
        info!(
            "Closing {} open streams",
            self.registry.total_connections()
        );
        self.shutdown.send_replace(true);
    }
}
