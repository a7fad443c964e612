// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chime_core::{Origin, TimerAction, TimerId};

/// Seed a row directly into the table, as if persisted by an earlier
/// process run.
fn seed(h: &Harness, id: &str, due_at_ms: u64) {
    h.runtime.table.lock().apply_event(&Event::TimerCreated {
        timer: TimerId::new(id),
        data: TimerRecord {
            id: TimerId::new(id),
            due_at_ms,
            action: TimerAction::None,
            loops: 0,
            interval_ms: 0,
            retries: 0,
            max_retries: 0,
            retry_delay_ms: 25_000,
            origin: Origin::default(),
        },
    });
}

#[test]
fn recover_loads_backlog_within_horizon() {
    let h = harness();
    let now = h.clock.epoch_ms();
    seed(&h, "overdue", now.saturating_sub(60_000));
    seed(&h, "soon", now + 1_000);
    seed(&h, "far", now + h.runtime.config.window_duration_ms + 1);

    let inserted = h.runtime.recover();

    assert_eq!(inserted, 2);
    let status = h.runtime.status();
    assert_eq!(status.window, 2);
    assert_eq!(status.horizon_ms, now + h.runtime.config.window_duration_ms);
    assert_eq!(status.next_due_ms, Some(now.saturating_sub(60_000)));
}

#[test]
fn recover_pages_past_page_size() {
    let h = harness_with(RuntimeConfig {
        page_size: 2,
        ..RuntimeConfig::default()
    });
    let now = h.clock.epoch_ms();
    for i in 0..5u64 {
        seed(&h, &format!("t{i}"), now + i * 100);
    }

    assert_eq!(h.runtime.recover(), 5);
    assert_eq!(h.runtime.status().window, 5);
}

#[test]
fn recover_pages_through_a_run_of_equal_due_timestamps() {
    let h = harness_with(RuntimeConfig {
        page_size: 2,
        ..RuntimeConfig::default()
    });
    let now = h.clock.epoch_ms();
    for i in 0..5u64 {
        seed(&h, &format!("t{i}"), now + 1_000);
    }

    assert_eq!(h.runtime.recover(), 5);
}

#[test]
fn reload_noop_while_horizon_is_fresh() {
    let h = harness();
    h.runtime.recover();
    let horizon = h.runtime.status().horizon_ms;

    assert!(!h.runtime.maybe_reload());
    assert_eq!(h.runtime.status().horizon_ms, horizon);
}

#[test]
fn reload_extends_horizon_past_half_window() {
    let h = harness();
    h.runtime.recover();
    let window = h.runtime.config.window_duration_ms;
    let now = h.clock.epoch_ms();
    seed(&h, "next-window", now + window + 1_000);

    // Cross the refill threshold
    h.clock
        .advance(Duration::from_millis(window / 2 + 1_000));

    assert!(h.runtime.maybe_reload());
    let status = h.runtime.status();
    assert_eq!(status.horizon_ms, now + 2 * window);
    assert_eq!(status.window, 1);
}

#[test]
fn reload_catches_up_after_long_idle() {
    let h = harness();
    h.runtime.recover();
    let window = h.runtime.config.window_duration_ms;

    // Idle for several windows
    h.clock.advance(Duration::from_millis(4 * window));
    let now = h.clock.epoch_ms();
    seed(&h, "future", now + 1_000);

    assert!(h.runtime.maybe_reload());
    let status = h.runtime.status();
    assert!(status.horizon_ms >= now + window / 2);
    assert_eq!(status.window, 1);
}

#[test]
fn reload_never_duplicates_write_through_entries() {
    let h = harness();
    h.runtime.recover();
    let window = h.runtime.config.window_duration_ms;

    // Written through into the window on create, inside the next refill
    // range as well once the horizon advances
    let record = h.create(CreateTimer {
        due_at_ms: h.clock.epoch_ms() + window - 1_000,
        ..CreateTimer::default()
    });

    h.clock
        .advance(Duration::from_millis(window / 2 + 1_000));
    h.runtime.maybe_reload();

    assert_eq!(h.runtime.status().window, 1);
    assert!(h.runtime.get_timer(&record.id).is_some());
}
