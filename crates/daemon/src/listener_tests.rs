// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::event_bus::{EventBus, EventReader};
use crate::protocol::{Request, Response};
use chime_adapters::{NoOpInvoker, TracedInvoker};
use chime_core::{Clock, CreateTimer, SystemClock, TimerId, UuidIdGen};
use chime_engine::{FiringOutcome, Runtime, RuntimeConfig};
use chime_storage::{TimerTable, Wal};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::net::UnixStream;
use tokio::sync::mpsc;

struct Harness {
    _dir: TempDir,
    socket: PathBuf,
    runtime: Arc<DaemonRuntime>,
    event_reader: EventReader,
    _outcome_rx: mpsc::Receiver<FiringOutcome>,
}

async fn harness() -> Harness {
    let dir = TempDir::new().unwrap();
    let socket = dir.path().join("test.sock");

    let wal = Wal::open(&dir.path().join("events.wal"), 0).unwrap();
    let (event_bus, event_reader) = EventBus::new(wal);
    let table = Arc::new(Mutex::new(TimerTable::new()));
    let (outcome_tx, outcome_rx) = mpsc::channel(8);
    let runtime = Arc::new(Runtime::new(
        TracedInvoker::new(NoOpInvoker::new()),
        SystemClock,
        UuidIdGen,
        RuntimeConfig::default(),
        Arc::clone(&table),
        outcome_tx,
    ));
    runtime.recover();

    let listener = UnixListener::bind(&socket).unwrap();
    tokio::spawn(
        Listener::new(listener, event_bus, Arc::clone(&runtime), Instant::now()).run(),
    );

    Harness {
        _dir: dir,
        socket,
        runtime,
        event_reader,
        _outcome_rx: outcome_rx,
    }
}

impl Harness {
    /// Apply everything the listener appended, as the fire loop would.
    fn apply_pending(&self) {
        let wal = self.event_reader.wal();
        loop {
            let entry = wal.lock().next_unprocessed().unwrap();
            match entry {
                Some(entry) => {
                    self.runtime.apply_event(&entry.event);
                    self.event_reader.mark_processed(entry.seq);
                }
                None => break,
            }
        }
    }
}

async fn roundtrip(socket: &Path, request: &Request) -> Response {
    let mut stream = UnixStream::connect(socket).await.unwrap();
    let data = protocol::encode(request).unwrap();
    protocol::write_message(&mut stream, &data).await.unwrap();
    let bytes = protocol::read_message(&mut stream).await.unwrap();
    protocol::decode(&bytes).unwrap()
}

fn create_request(id: &str) -> Request {
    Request::Create {
        timer: CreateTimer {
            due_at_ms: Clock::epoch_ms(&SystemClock) + 5_000,
            id: Some(TimerId::new(id)),
            ..CreateTimer::default()
        },
    }
}

#[tokio::test]
async fn ping_gets_pong() {
    let h = harness().await;
    assert_eq!(roundtrip(&h.socket, &Request::Ping).await, Response::Pong);
}

#[tokio::test]
async fn hello_reports_daemon_version() {
    let h = harness().await;
    let response = roundtrip(
        &h.socket,
        &Request::Hello {
            version: "0.0.1".to_string(),
        },
    )
    .await;
    assert_eq!(
        response,
        Response::Hello {
            version: PROTOCOL_VERSION.to_string()
        }
    );
}

#[tokio::test]
async fn create_acks_with_id_and_persists_the_event() {
    let h = harness().await;

    let response = roundtrip(&h.socket, &create_request("t-1")).await;
    assert_eq!(
        response,
        Response::Created {
            id: TimerId::new("t-1")
        }
    );

    // Durable before the ack: the entry is already on disk
    let wal = h.event_reader.wal();
    let entries = wal.lock().entries_after(0).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].event.timer_id(), Some(&TimerId::new("t-1")));
}

#[tokio::test]
async fn create_rejects_impossible_timer() {
    let h = harness().await;

    let request = Request::Create {
        timer: CreateTimer {
            due_at_ms: Clock::epoch_ms(&SystemClock) + 5_000,
            loops: 3,
            interval_ms: 0,
            ..CreateTimer::default()
        },
    };
    let response = roundtrip(&h.socket, &request).await;
    let Response::Error { message } = response else {
        panic!("expected error, got {response:?}");
    };
    assert!(message.contains("impossible timer"));

    // Rejected commands leave no trace in the log
    let wal = h.event_reader.wal();
    assert!(wal.lock().entries_after(0).unwrap().is_empty());
}

#[tokio::test]
async fn cancel_unknown_timer_returns_error() {
    let h = harness().await;

    let response = roundtrip(
        &h.socket,
        &Request::Cancel {
            id: TimerId::new("ghost"),
        },
    )
    .await;
    let Response::Error { message } = response else {
        panic!("expected error, got {response:?}");
    };
    assert!(message.contains("not found"));
}

#[tokio::test]
async fn cancel_removes_a_created_timer() {
    let h = harness().await;

    roundtrip(&h.socket, &create_request("t-2")).await;
    h.apply_pending();

    let response = roundtrip(
        &h.socket,
        &Request::Cancel {
            id: TimerId::new("t-2"),
        },
    )
    .await;
    assert_eq!(
        response,
        Response::Canceled {
            id: TimerId::new("t-2")
        }
    );

    h.apply_pending();
    assert!(h.runtime.get_timer(&TimerId::new("t-2")).is_none());
}

#[tokio::test]
async fn status_reflects_applied_state() {
    let h = harness().await;

    roundtrip(&h.socket, &create_request("t-3")).await;
    h.apply_pending();

    let response = roundtrip(&h.socket, &Request::Status).await;
    let Response::Status(status) = response else {
        panic!("expected status, got {response:?}");
    };
    assert_eq!(status.pid, std::process::id());
    assert_eq!(status.version, PROTOCOL_VERSION);
    assert_eq!(status.timers, 1);
    assert_eq!(status.window, 1);
    assert!(status.next_due_ms.is_some());
}

#[tokio::test]
async fn shutdown_request_appends_a_durable_shutdown_event() {
    let h = harness().await;

    roundtrip(&h.socket, &create_request("t-last")).await;
    let response = roundtrip(&h.socket, &Request::Shutdown).await;
    assert_eq!(response, Response::ShuttingDown);

    // On disk, ordered after the command that preceded it
    let wal = h.event_reader.wal();
    let entries = wal.lock().entries_after(0).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].event, Event::Shutdown);
}
