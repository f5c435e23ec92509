//! Reconnecting subscriber for a room's event stream
//!
//! The subscriber runs as a task: connect, forward decoded events, and
//! when the stream drops wait out the next [`Backoff`] delay before trying
//! again. A `connected` event resets the backoff. Missing, expired or
//! malformed rooms end the task since retrying cannot help.

pub mod decoder;

use std::time::Duration;

use futures_util::StreamExt;
use log::{debug, info, warn};
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::constants::{API_PATH, SSE_PATH};
use crate::core::backoff::{Backoff, ReconnectPolicy};
use crate::core::event::StreamEvent;
use crate::error::{Result, RoomcastError};

pub use decoder::{FrameDecoder, RawEvent};

/// What the subscriber reports to its consumer
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriberEvent {
    Event(StreamEvent),
    Disconnected { reason: String },
    Reconnecting { attempt: u32, delay: Duration },
}

pub struct RoomSubscriber {
    base_url: String,
    room_code: String,
    policy: ReconnectPolicy,
    http: reqwest::Client,
}

impl RoomSubscriber {
    pub fn new(base_url: impl Into<String>, room_code: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            room_code: room_code.into(),
            policy: ReconnectPolicy::default(),
            http: reqwest::Client::new(),
        }
    }

    pub fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn stream_url(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            API_PATH,
            SSE_PATH,
            self.room_code
        )
    }

    /// Run the subscriber on its own task
    pub fn spawn(
        self,
        events: mpsc::UnboundedSender<SubscriberEvent>,
        shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<Result<()>> {
        tokio::spawn(self.run(events, shutdown))
    }

    /// Subscribe until shutdown, until the consumer goes away, or until
    /// the room is gone or retries run out (both errors)
    pub async fn run(
        self,
        events: mpsc::UnboundedSender<SubscriberEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let mut backoff = Backoff::new(self.policy.clone());

        loop {
            let outcome = tokio::select! {
                outcome = self.connect_once(&events, &mut backoff) => outcome,
                _ = wait_for_shutdown(&mut shutdown) => return Ok(()),
            };
            if events.is_closed() {
                return Ok(());
            }

            let reason = match outcome {
                Err(e) if is_terminal(&e) => {
                    info!("Room {} cannot be subscribed: {}", self.room_code, e);
                    return Err(e);
                }
                Err(e) => e.to_string(),
                Ok(()) => "stream ended".to_string(),
            };
            debug!("Stream for room {} dropped: {}", self.room_code, reason);
            let _ = events.send(SubscriberEvent::Disconnected { reason });

            let Some(delay) = backoff.next_delay() else {
                warn!(
                    "Giving up on room {} after {} attempts",
                    self.room_code,
                    backoff.attempts()
                );
                return Err(RoomcastError::RetriesExhausted(backoff.attempts()));
            };
            let _ = events.send(SubscriberEvent::Reconnecting {
                attempt: backoff.attempts(),
                delay,
            });

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = wait_for_shutdown(&mut shutdown) => return Ok(()),
            }
        }
    }

    async fn connect_once(
        &self,
        events: &mpsc::UnboundedSender<SubscriberEvent>,
        backoff: &mut Backoff,
    ) -> Result<()> {
        let response = self
            .http
            .get(self.stream_url())
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => return Err(RoomcastError::RoomNotFound),
            StatusCode::GONE => return Err(RoomcastError::RoomExpired),
            StatusCode::BAD_REQUEST => return Err(RoomcastError::InvalidRoomCode),
            StatusCode::SERVICE_UNAVAILABLE => return Err(RoomcastError::RoomFull),
            status => {
                return Err(RoomcastError::StreamError(format!(
                    "Unexpected status {}",
                    status
                )))
            }
        }

        let mut body = response.bytes_stream();
        let mut decoder = FrameDecoder::new();
        while let Some(chunk) = body.next().await {
            for raw in decoder.push(&chunk?)? {
                let event = match StreamEvent::decode(&raw.event, &raw.data) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!("Skipping undecodable {} event: {}", raw.event, e);
                        continue;
                    }
                };
                if matches!(event, StreamEvent::Connected(_)) {
                    backoff.reset();
                }
                if events.send(SubscriberEvent::Event(event)).is_err() {
                    return Ok(());
                }
            }
        }
        Ok(())
    }
}

fn is_terminal(err: &RoomcastError) -> bool {
    matches!(
        err,
        RoomcastError::RoomNotFound | RoomcastError::RoomExpired | RoomcastError::InvalidRoomCode
    )
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        let requested = *shutdown.borrow_and_update();
        if requested {
            return;
        }
        if shutdown.changed().await.is_err() {
            // Nobody can signal shutdown any more
            std::future::pending::<()>().await;
        }
    }
}
