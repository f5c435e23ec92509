use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use roomcast::core::{ConnectionRegistry, EventSink, Frame, StreamEvent};
use roomcast::error::{Result, RoomcastError};
use serde_json::json;

// Sink that records every frame it accepts
#[derive(Clone, Default)]
struct RecordingSink {
    frames: Arc<Mutex<Vec<Frame>>>,
}

impl RecordingSink {
    fn received(&self) -> Vec<String> {
        self.frames
            .lock()
            .unwrap()
            .iter()
            .map(|f| String::from_utf8(f.to_vec()).unwrap())
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn send(&self, frame: Frame) -> Result<()> {
        self.frames.lock().unwrap().push(frame);
        Ok(())
    }
}

// Sink that accepts a fixed number of frames, then fails forever
struct FlakySink {
    remaining: AtomicUsize,
    calls: Arc<AtomicUsize>,
}

impl EventSink for FlakySink {
    fn send(&self, _frame: Frame) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let ok = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if ok {
            Ok(())
        } else {
            Err(RoomcastError::ConnectionClosed)
        }
    }
}

#[test]
fn test_unknown_room_is_empty_and_broadcast_is_noop() {
    let registry = ConnectionRegistry::new();

    assert_eq!(registry.connection_count("ZZZZZZ"), 0);
    assert_eq!(registry.broadcast("ZZZZZZ", "message", &json!({})), 0);
    assert_eq!(registry.room_count(), 0);
}

#[test]
fn test_fan_out_then_remove() {
    let registry = ConnectionRegistry::new();
    let sinks: Vec<RecordingSink> = (0..3).map(|_| RecordingSink::default()).collect();
    let ids: Vec<_> = sinks
        .iter()
        .map(|sink| registry.add_connection("ABCD23", sink.clone()))
        .collect();

    let delivered = registry.broadcast("ABCD23", "message", &json!({"content": "hi"}));
    assert_eq!(delivered, 3);
    for sink in &sinks {
        assert_eq!(
            sink.received(),
            vec!["event: message\ndata: {\"content\":\"hi\"}\n\n".to_string()]
        );
    }

    registry.remove_connection("ABCD23", ids[0]);
    let delivered = registry.broadcast("ABCD23", "message", &json!({"content": "again"}));

    assert_eq!(delivered, 2);
    assert_eq!(sinks[0].received().len(), 1);
    assert_eq!(sinks[1].received().len(), 2);
    assert_eq!(sinks[2].received().len(), 2);
    assert_eq!(registry.connection_count("ABCD23"), 2);
}

#[test]
fn test_frames_are_shared_not_reencoded() {
    let registry = ConnectionRegistry::new();
    let a = RecordingSink::default();
    let b = RecordingSink::default();
    registry.add_connection("ABCD23", a.clone());
    registry.add_connection("ABCD23", b.clone());

    registry.broadcast_event("ABCD23", &StreamEvent::ping());

    let frame_a = a.frames.lock().unwrap()[0].clone();
    let frame_b = b.frames.lock().unwrap()[0].clone();
    assert_eq!(frame_a, frame_b);
    assert_eq!(frame_a.as_ptr(), frame_b.as_ptr());
}

#[test]
fn test_remove_is_idempotent() {
    let registry = ConnectionRegistry::new();
    let keep = registry.add_connection("ABCD23", RecordingSink::default());
    let gone = registry.add_connection("ABCD23", RecordingSink::default());

    registry.remove_connection("ABCD23", gone);
    registry.remove_connection("ABCD23", gone);
    registry.remove_connection("QQQQQQ", keep);

    assert_eq!(registry.connection_count("ABCD23"), 1);

    registry.remove_connection("ABCD23", keep);
    assert_eq!(registry.connection_count("ABCD23"), 0);
    assert_eq!(registry.room_count(), 0);
}

#[test]
fn test_rooms_are_isolated() {
    let registry = ConnectionRegistry::new();
    let in_a = RecordingSink::default();
    let in_b = RecordingSink::default();
    registry.add_connection("AAAAAA", in_a.clone());
    registry.add_connection("BBBBBB", in_b.clone());

    registry.broadcast("AAAAAA", "message", &json!({"content": "only a"}));

    assert_eq!(in_a.received().len(), 1);
    assert!(in_b.received().is_empty());
}

#[test]
fn test_failed_sink_removed_and_never_written_again() {
    let registry = ConnectionRegistry::new();
    let healthy = RecordingSink::default();
    let calls = Arc::new(AtomicUsize::new(0));
    registry.add_connection("ABCD23", healthy.clone());
    registry.add_connection(
        "ABCD23",
        FlakySink {
            remaining: AtomicUsize::new(1),
            calls: calls.clone(),
        },
    );

    assert_eq!(registry.broadcast("ABCD23", "message", &json!({"n": 1})), 2);
    assert_eq!(registry.connection_count("ABCD23"), 2);

    assert_eq!(registry.broadcast("ABCD23", "message", &json!({"n": 2})), 1);
    assert_eq!(registry.connection_count("ABCD23"), 1);

    registry.broadcast("ABCD23", "message", &json!({"n": 3}));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(healthy.received().len(), 3);
}

#[test]
fn test_concurrent_churn_and_broadcast() {
    let registry = Arc::new(ConnectionRegistry::new());
    let observer = RecordingSink::default();
    registry.add_connection("ABCD23", observer.clone());

    let mut handles = Vec::new();
    for worker in 0..8 {
        let registry = registry.clone();
        handles.push(thread::spawn(move || {
            for round in 0..200 {
                let id = registry.add_connection("ABCD23", RecordingSink::default());
                registry.broadcast("ABCD23", "message", &json!({"worker": worker, "round": round}));
                registry.remove_connection("ABCD23", id);
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(registry.connection_count("ABCD23"), 1);
    assert_eq!(registry.total_connections(), 1);
    assert_eq!(observer.received().len(), 8 * 200);
}
