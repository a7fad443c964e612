// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chime_core::{Origin, TimerAction, TimerId, TimerRecord};
use std::io::Write as _;
use tempfile::TempDir;

fn record(id: &str) -> TimerRecord {
    TimerRecord {
        id: TimerId::new(id),
        due_at_ms: 1_000,
        action: TimerAction::None,
        loops: 1,
        interval_ms: 0,
        retries: 0,
        max_retries: 0,
        retry_delay_ms: 25_000,
        origin: Origin::default(),
    }
}

fn created(id: &str) -> Event {
    Event::TimerCreated {
        timer: TimerId::new(id),
        data: record(id),
    }
}

#[test]
fn append_assigns_increasing_seqs() {
    let dir = TempDir::new().unwrap();
    let mut wal = Wal::open(&dir.path().join("events.wal"), 0).unwrap();

    assert_eq!(wal.append(&created("a")).unwrap(), 1);
    assert_eq!(wal.append(&created("b")).unwrap(), 2);
    assert_eq!(wal.write_seq(), 2);
}

#[test]
fn entries_survive_reopen_after_flush() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("events.wal");

    {
        let mut wal = Wal::open(&path, 0).unwrap();
        wal.append(&created("a")).unwrap();
        wal.append(&created("b")).unwrap();
        wal.flush().unwrap();
    }

    let wal = Wal::open(&path, 0).unwrap();
    assert_eq!(wal.write_seq(), 2);
    let entries = wal.entries_after(0).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].seq, 1);
    assert_eq!(entries[1].event.timer_id(), Some(&TimerId::new("b")));
}

#[test]
fn unflushed_entries_are_lost_on_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("events.wal");

    {
        let mut wal = Wal::open(&path, 0).unwrap();
        wal.append(&created("a")).unwrap();
        wal.flush().unwrap();
        wal.append(&created("b")).unwrap();
        // dropped without flush
    }

    let wal = Wal::open(&path, 0).unwrap();
    assert_eq!(wal.write_seq(), 1);
    assert_eq!(wal.entries_after(0).unwrap().len(), 1);
}

#[test]
fn next_unprocessed_walks_entries_in_order() {
    let dir = TempDir::new().unwrap();
    let mut wal = Wal::open(&dir.path().join("events.wal"), 0).unwrap();

    wal.append(&created("a")).unwrap();
    wal.append(&created("b")).unwrap();

    let first = wal.next_unprocessed().unwrap().unwrap();
    assert_eq!(first.seq, 1);
    wal.mark_processed(first.seq);

    let second = wal.next_unprocessed().unwrap().unwrap();
    assert_eq!(second.seq, 2);
    wal.mark_processed(second.seq);

    assert!(wal.next_unprocessed().unwrap().is_none());
    assert_eq!(wal.processed_seq(), 2);
}

#[test]
fn reopen_resumes_cursor_after_processed_seq() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("events.wal");

    {
        let mut wal = Wal::open(&path, 0).unwrap();
        wal.append(&created("a")).unwrap();
        wal.append(&created("b")).unwrap();
        wal.append(&created("c")).unwrap();
        wal.flush().unwrap();
    }

    // Snapshot recorded seq 2 as processed
    let mut wal = Wal::open(&path, 2).unwrap();
    let next = wal.next_unprocessed().unwrap().unwrap();
    assert_eq!(next.seq, 3);
    assert!(wal.next_unprocessed().unwrap().is_none());
}

#[test]
fn entries_after_filters_by_seq() {
    let dir = TempDir::new().unwrap();
    let mut wal = Wal::open(&dir.path().join("events.wal"), 0).unwrap();

    wal.append(&created("a")).unwrap();
    wal.append(&created("b")).unwrap();
    wal.append(&created("c")).unwrap();
    wal.flush().unwrap();

    let entries = wal.entries_after(1).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].seq, 2);
    assert_eq!(entries[1].seq, 3);
}

#[test]
fn corrupt_tail_is_truncated_on_open() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("events.wal");

    {
        let mut wal = Wal::open(&path, 0).unwrap();
        wal.append(&created("a")).unwrap();
        wal.append(&created("b")).unwrap();
        wal.flush().unwrap();
    }

    // Simulate a torn write at the end of the file
    let mut file = OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(b"{\"seq\":3,\"event\":{\"ty").unwrap();
    drop(file);

    let mut wal = Wal::open(&path, 0).unwrap();
    assert_eq!(wal.write_seq(), 2);
    assert_eq!(wal.entries_after(0).unwrap().len(), 2);

    // New appends land on a clean line boundary
    wal.append(&created("c")).unwrap();
    wal.flush().unwrap();
    let entries = wal.entries_after(0).unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[2].seq, 3);
}

#[test]
fn truncate_before_drops_snapshotted_entries() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("events.wal");
    let mut wal = Wal::open(&path, 0).unwrap();

    wal.append(&created("a")).unwrap();
    wal.append(&created("b")).unwrap();
    wal.append(&created("c")).unwrap();
    wal.mark_processed(2);
    wal.truncate_before(2).unwrap();

    let entries = wal.entries_after(0).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].seq, 3);

    // Sequence numbers keep counting after truncation
    assert_eq!(wal.append(&created("d")).unwrap(), 4);
    let next = wal.next_unprocessed().unwrap().unwrap();
    assert_eq!(next.seq, 3);
}

#[test]
fn needs_flush_after_threshold() {
    let dir = TempDir::new().unwrap();
    let mut wal = Wal::open(&dir.path().join("events.wal"), 0).unwrap();

    assert!(!wal.needs_flush());
    for i in 0..FLUSH_THRESHOLD {
        wal.append(&created(&format!("t{i}"))).unwrap();
    }
    assert!(wal.needs_flush());

    wal.flush().unwrap();
    assert!(!wal.needs_flush());
}

#[test]
fn needs_flush_after_interval() {
    let dir = TempDir::new().unwrap();
    let mut wal = Wal::open(&dir.path().join("events.wal"), 0).unwrap();

    wal.append(&created("a")).unwrap();
    std::thread::sleep(FLUSH_INTERVAL + Duration::from_millis(5));
    assert!(wal.needs_flush());
}

#[test]
fn flush_on_empty_buffer_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    let mut wal = Wal::open(&dir.path().join("events.wal"), 0).unwrap();
    wal.flush().unwrap();
    assert_eq!(wal.write_seq(), 0);
}
