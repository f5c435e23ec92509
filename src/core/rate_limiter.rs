//! Rate limiting module to prevent abuse of the write routes
//!
//! Fixed-window counting per client identifier (usually an IP address).
//! State lives in this process only, so limits apply per instance.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Outcome of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    /// Time until the current window resets
    pub reset_in: Duration,
}

struct WindowEntry {
    count: u32,
    reset_at: Instant,
}

/// Request rate limiter keyed by client identifier
pub struct RequestRateLimiter {
    windows: RwLock<HashMap<String, WindowEntry>>,
    max_requests: u32,
    window_duration: Duration,
    /// Maximum number of clients to track to prevent memory exhaustion
    max_tracked_clients: usize,
}

impl RequestRateLimiter {
    pub fn new(max_requests: u32, window_duration: Duration) -> Self {
        Self {
            windows: RwLock::new(HashMap::new()),
            max_requests,
            window_duration,
            max_tracked_clients: 10_000,
        }
    }

    /// Requests per minute, the usual configuration
    pub fn per_minute(max_requests: u32) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    /// Count one request for `client` and report whether it is allowed
    pub async fn check_and_record(&self, client: &str) -> RateLimitDecision {
        let now = Instant::now();
        let mut windows = self.windows.write().await;

        // Enforce memory limit by dropping expired windows first
        if windows.len() >= self.max_tracked_clients && !windows.contains_key(client) {
            windows.retain(|_, entry| entry.reset_at > now);
            if windows.len() >= self.max_tracked_clients {
                log::warn!("Rate limiter tracking {} clients, refusing new ones", windows.len());
                return RateLimitDecision {
                    allowed: false,
                    remaining: 0,
                    reset_in: self.window_duration,
                };
            }
        }

        let entry = windows.entry(client.to_string()).or_insert(WindowEntry {
            count: 0,
            reset_at: now + self.window_duration,
        });
        if now >= entry.reset_at {
            entry.count = 0;
            entry.reset_at = now + self.window_duration;
        }

        let reset_in = entry.reset_at.saturating_duration_since(now);
        if entry.count >= self.max_requests {
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_in,
            };
        }

        entry.count += 1;
        RateLimitDecision {
            allowed: true,
            remaining: self.max_requests - entry.count,
            reset_in,
        }
    }

    /// Clean up expired windows to prevent memory leaks
    pub async fn cleanup_old_entries(&self) {
        let now = Instant::now();
        self.windows
            .write()
            .await
            .retain(|_, entry| entry.reset_at > now);
    }

    /// Get number of tracked clients
    pub async fn tracked_clients(&self) -> usize {
        self.windows.read().await.len()
    }

    /// Start cleanup task for expired windows
    pub fn start_cleanup_task(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.window_duration);
            loop {
                interval.tick().await;
                self.cleanup_old_entries().await;
            }
        })
    }
}
