use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use futures_util::StreamExt;
use roomcast::core::event::{ConnectedPayload, StreamEvent};
use roomcast::core::{ConnectionRegistry, EventStream, SessionState, StreamSession};
use roomcast::error::RoomcastError;
use roomcast::storage::{MemoryRoomStore, RoomStore};
use serde_json::json;
use tokio::sync::watch;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(2);

async fn store_with_room(code: &str, ttl: ChronoDuration) -> MemoryRoomStore {
    let store = MemoryRoomStore::new();
    store
        .create_room(code, Utc::now() + ttl)
        .await
        .unwrap()
        .unwrap();
    store
}

fn parse(frame: &[u8]) -> StreamEvent {
    let text = std::str::from_utf8(frame).unwrap();
    let mut lines = text.lines();
    let event = lines.next().unwrap().strip_prefix("event: ").unwrap();
    let data = lines.next().unwrap().strip_prefix("data: ").unwrap();
    assert!(text.ends_with("\n\n"));
    StreamEvent::decode(event, data).unwrap()
}

async fn next_event(stream: &mut EventStream) -> StreamEvent {
    let frame = timeout(WAIT, stream.next())
        .await
        .expect("timed out waiting for a frame")
        .expect("stream ended");
    parse(&frame)
}

#[tokio::test]
async fn test_open_unknown_room_never_registers() {
    let registry = Arc::new(ConnectionRegistry::new());
    let store = MemoryRoomStore::new();
    let (_tx, shutdown) = watch::channel(false);

    let result = StreamSession::new(registry.clone(), "ABCD23")
        .open(&store, Duration::from_secs(30), shutdown)
        .await;

    assert!(matches!(result, Err(RoomcastError::RoomNotFound)));
    assert_eq!(registry.room_count(), 0);
}

#[tokio::test]
async fn test_open_expired_room_never_registers() {
    let registry = Arc::new(ConnectionRegistry::new());
    let store = store_with_room("ABCD23", ChronoDuration::minutes(-1)).await;
    let (_tx, shutdown) = watch::channel(false);

    let result = StreamSession::new(registry.clone(), "ABCD23")
        .open(&store, Duration::from_secs(30), shutdown)
        .await;

    assert!(matches!(result, Err(RoomcastError::RoomExpired)));
    assert_eq!(registry.connection_count("ABCD23"), 0);
}

#[tokio::test]
async fn test_connected_first_then_broadcasts() {
    let registry = Arc::new(ConnectionRegistry::new());
    let store = store_with_room("ABCD23", ChronoDuration::hours(1)).await;
    let (_tx, shutdown) = watch::channel(false);

    let mut stream = StreamSession::new(registry.clone(), "ABCD23")
        .open(&store, Duration::from_secs(30), shutdown)
        .await
        .unwrap();
    assert_eq!(stream.session().state(), SessionState::Open);
    assert_eq!(stream.session().room_code(), "ABCD23");
    assert_eq!(registry.connection_count("ABCD23"), 1);

    match next_event(&mut stream).await {
        StreamEvent::Connected(ConnectedPayload { room_code, timestamp }) => {
            assert_eq!(room_code, "ABCD23");
            assert!(timestamp > 0);
        }
        other => panic!("expected connected, got {:?}", other),
    }

    registry.broadcast(
        "ABCD23",
        "message",
        &json!({"id": "m1", "content": "hi", "createdAt": "2024-01-01T00:00:00.000Z"}),
    );
    match next_event(&mut stream).await {
        StreamEvent::Message(message) => assert_eq!(message.content, "hi"),
        other => panic!("expected message, got {:?}", other),
    }
}

#[tokio::test]
async fn test_pings_arrive_on_interval() {
    let registry = Arc::new(ConnectionRegistry::new());
    let store = store_with_room("ABCD23", ChronoDuration::hours(1)).await;
    let (_tx, shutdown) = watch::channel(false);

    let mut stream = StreamSession::new(registry, "ABCD23")
        .open(&store, Duration::from_millis(20), shutdown)
        .await
        .unwrap();

    assert!(matches!(next_event(&mut stream).await, StreamEvent::Connected(_)));
    assert!(matches!(next_event(&mut stream).await, StreamEvent::Ping(_)));
    assert!(matches!(next_event(&mut stream).await, StreamEvent::Ping(_)));
}

#[tokio::test]
async fn test_dropping_stream_deregisters() {
    let registry = Arc::new(ConnectionRegistry::new());
    let store = store_with_room("ABCD23", ChronoDuration::hours(1)).await;
    let (_tx, shutdown) = watch::channel(false);

    let first = StreamSession::new(registry.clone(), "ABCD23")
        .open(&store, Duration::from_secs(30), shutdown.clone())
        .await
        .unwrap();
    let second = StreamSession::new(registry.clone(), "ABCD23")
        .open(&store, Duration::from_secs(30), shutdown)
        .await
        .unwrap();
    assert_ne!(
        first.session().connection_id(),
        second.session().connection_id()
    );
    assert_eq!(registry.connection_count("ABCD23"), 2);

    drop(first);
    assert_eq!(registry.connection_count("ABCD23"), 1);
    drop(second);
    assert_eq!(registry.connection_count("ABCD23"), 0);
    assert_eq!(registry.room_count(), 0);
}

#[tokio::test]
async fn test_explicit_close_is_idempotent() {
    let registry = Arc::new(ConnectionRegistry::new());
    let store = store_with_room("ABCD23", ChronoDuration::hours(1)).await;
    let (_tx, shutdown) = watch::channel(false);

    let mut stream = StreamSession::new(registry.clone(), "ABCD23")
        .open(&store, Duration::from_secs(30), shutdown)
        .await
        .unwrap();

    stream.close();
    stream.close();
    assert_eq!(stream.session().state(), SessionState::Closed);
    assert_eq!(registry.connection_count("ABCD23"), 0);

    // The queued connected frame drains, then the stream ends.
    assert!(matches!(next_event(&mut stream).await, StreamEvent::Connected(_)));
    assert!(timeout(WAIT, stream.next()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_shutdown_ends_stream() {
    let registry = Arc::new(ConnectionRegistry::new());
    let store = store_with_room("ABCD23", ChronoDuration::hours(1)).await;
    let (shutdown_tx, shutdown) = watch::channel(false);

    let mut stream = StreamSession::new(registry.clone(), "ABCD23")
        .open(&store, Duration::from_secs(30), shutdown)
        .await
        .unwrap();
    assert!(matches!(next_event(&mut stream).await, StreamEvent::Connected(_)));

    shutdown_tx.send(true).unwrap();

    assert!(timeout(WAIT, stream.next()).await.unwrap().is_none());
    assert_eq!(stream.session().state(), SessionState::Closed);
    assert_eq!(registry.connection_count("ABCD23"), 0);
}

#[tokio::test]
async fn test_closing_room_ends_stream() {
    let registry = Arc::new(ConnectionRegistry::new());
    let store = store_with_room("ABCD23", ChronoDuration::hours(1)).await;
    let (_tx, shutdown) = watch::channel(false);

    let mut stream = StreamSession::new(registry.clone(), "ABCD23")
        .open(&store, Duration::from_secs(30), shutdown)
        .await
        .unwrap();
    assert!(matches!(next_event(&mut stream).await, StreamEvent::Connected(_)));

    assert_eq!(registry.close_room("ABCD23"), 1);

    assert!(timeout(WAIT, stream.next()).await.unwrap().is_none());
    assert_eq!(stream.session().state(), SessionState::Closed);
    assert_eq!(registry.room_count(), 0);
}

#[tokio::test]
async fn test_removed_connection_closes_session() {
    let registry = Arc::new(ConnectionRegistry::new());
    let store = store_with_room("ABCD23", ChronoDuration::hours(1)).await;
    let (_tx, shutdown) = watch::channel(false);

    let mut stream = StreamSession::new(registry.clone(), "ABCD23")
        .open(&store, Duration::from_millis(20), shutdown)
        .await
        .unwrap();
    let id = stream.session().connection_id().unwrap();
    assert!(matches!(next_event(&mut stream).await, StreamEvent::Connected(_)));

    assert!(registry.remove_connection("ABCD23", id));

    assert!(timeout(WAIT, stream.next()).await.unwrap().is_none());
    assert_eq!(stream.session().state(), SessionState::Closed);
}
