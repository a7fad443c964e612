// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::error::EngineError;
use chime_core::{CommandError, Origin, TimerId};

#[test]
fn create_assigns_id_and_emits_created() {
    let h = harness();

    let (record, events) = h
        .runtime
        .handle_create(create_cmd(1_000, &h.clock))
        .unwrap();

    assert_eq!(record.id, "timer-1");
    assert_eq!(record.retries, 0);
    assert_eq!(record.retry_delay_ms, chime_core::DEFAULT_RETRY_DELAY_MS);
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], Event::TimerCreated { timer, .. } if *timer == record.id));
}

#[test]
fn create_rejects_looping_timer_without_interval() {
    let h = harness();

    let cmd = CreateTimer {
        loops: 3,
        interval_ms: 0,
        ..create_cmd(1_000, &h.clock)
    };
    let err = h.runtime.handle_create(cmd).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Command(CommandError::ImpossibleTimer)
    ));
}

#[test]
fn create_honors_client_supplied_id() {
    let h = harness();

    let cmd = CreateTimer {
        id: Some(TimerId::new("reminder-42")),
        ..create_cmd(1_000, &h.clock)
    };
    let record = h.create(cmd);
    assert_eq!(record.id, "reminder-42");
    assert!(h.runtime.get_timer(&TimerId::new("reminder-42")).is_some());
}

#[test]
fn create_rejects_duplicate_id() {
    let h = harness();
    h.runtime.recover();

    let first_due = h.clock.epoch_ms() + 100;
    h.create(CreateTimer {
        id: Some(TimerId::new("dup")),
        due_at_ms: first_due,
        ..CreateTimer::default()
    });

    let err = h
        .runtime
        .handle_create(CreateTimer {
            id: Some(TimerId::new("dup")),
            due_at_ms: h.clock.epoch_ms() + 5_000,
            ..CreateTimer::default()
        })
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Command(CommandError::AlreadyExists(id)) if id == "dup"
    ));

    // The live row and its window entry are untouched
    let row = h.runtime.get_timer(&TimerId::new("dup")).unwrap();
    assert_eq!(row.due_at_ms, first_due);
    assert_eq!(h.runtime.next_due_ms(), Some(first_due));
    assert_eq!(h.runtime.status().timers, 1);
}

#[test]
fn created_within_horizon_enters_window() {
    let h = harness();
    h.runtime.recover();

    h.create(create_cmd(1_000, &h.clock));

    assert_eq!(h.runtime.status().window, 1);
    assert_eq!(h.runtime.next_due_ms(), Some(h.clock.epoch_ms() + 1_000));
}

#[test]
fn created_beyond_horizon_stays_out_of_window() {
    let h = harness();
    h.runtime.recover();

    let far = h.runtime.config.window_duration_ms + 60_000;
    h.create(create_cmd(far, &h.clock));

    assert_eq!(h.runtime.status().timers, 1);
    assert_eq!(h.runtime.status().window, 0);
}

#[test]
fn cancel_unknown_timer_fails() {
    let h = harness();

    let err = h
        .runtime
        .handle_cancel(&TimerId::new("ghost"), Origin::default())
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Command(CommandError::NotFound(id)) if id == "ghost"
    ));
}

#[test]
fn cancel_removes_from_table_and_window() {
    let h = harness();
    h.runtime.recover();
    let record = h.create(create_cmd(1_000, &h.clock));

    let events = h
        .runtime
        .handle_cancel(&record.id, Origin::default())
        .unwrap();
    for event in &events {
        h.runtime.apply_event(event);
    }

    assert_eq!(h.runtime.status().timers, 0);
    assert_eq!(h.runtime.status().window, 0);
    assert_eq!(h.runtime.next_due_ms(), None);
}
