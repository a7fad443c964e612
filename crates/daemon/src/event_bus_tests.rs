// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chime_core::{Origin, TimerId};
use tempfile::TempDir;

fn canceled(id: &str) -> Event {
    Event::TimerCanceled {
        timer: TimerId::new(id),
        origin: Origin::default(),
    }
}

fn bus_in(dir: &TempDir) -> (EventBus, EventReader) {
    let wal = Wal::open(&dir.path().join("events.wal"), 0).unwrap();
    EventBus::new(wal)
}

#[tokio::test]
async fn reader_receives_sent_events_in_order() {
    let dir = TempDir::new().unwrap();
    let (bus, mut reader) = bus_in(&dir);

    bus.send(canceled("a")).unwrap();
    bus.send(canceled("b")).unwrap();

    let first = reader.recv().await.unwrap().unwrap();
    assert_eq!(first.seq, 1);
    reader.mark_processed(first.seq);

    let second = reader.recv().await.unwrap().unwrap();
    assert_eq!(second.event.timer_id(), Some(&TimerId::new("b")));
}

#[tokio::test]
async fn recv_wakes_on_send() {
    let dir = TempDir::new().unwrap();
    let (bus, mut reader) = bus_in(&dir);

    let handle = tokio::spawn(async move { reader.recv().await });
    tokio::task::yield_now().await;
    bus.send(canceled("late")).unwrap();

    let entry = handle.await.unwrap().unwrap().unwrap();
    assert_eq!(entry.seq, 1);
}

#[tokio::test]
async fn recv_returns_none_when_all_senders_dropped() {
    let dir = TempDir::new().unwrap();
    let (bus, mut reader) = bus_in(&dir);
    drop(bus);

    assert!(reader.recv().await.unwrap().is_none());
}

#[tokio::test]
async fn send_all_assigns_contiguous_seqs() {
    let dir = TempDir::new().unwrap();
    let (bus, mut reader) = bus_in(&dir);

    let last = bus
        .send_all(&[canceled("a"), canceled("b"), canceled("c")])
        .unwrap();
    assert_eq!(last, 3);

    bus.flush().unwrap();
    for expected in 1..=3 {
        let entry = reader.recv().await.unwrap().unwrap();
        assert_eq!(entry.seq, expected);
        reader.mark_processed(expected);
    }
}
