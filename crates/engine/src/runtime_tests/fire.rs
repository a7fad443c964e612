// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chime_core::Origin;

#[tokio::test]
async fn one_shot_success_finishes_timer() {
    let mut h = harness();
    h.runtime.recover();
    let record = h.create(create_cmd(100, &h.clock));

    h.clock.advance(Duration::from_millis(100));
    let events = h.fire_one().await;

    assert_eq!(h.invoker.calls().len(), 1);
    assert_eq!(h.invoker.calls()[0].timer, record.id);
    assert!(
        matches!(&events[0], Event::TimerFinished { timer, error: None, .. } if *timer == record.id)
    );
    assert_eq!(h.runtime.status().timers, 0);
    assert_eq!(h.runtime.status().window, 0);
}

#[tokio::test]
async fn looping_timer_rearms_phase_locked() {
    let mut h = harness();
    h.runtime.recover();
    let record = h.create(CreateTimer {
        loops: 2,
        interval_ms: 1_000,
        ..create_cmd(100, &h.clock)
    });
    let first_due = record.due_at_ms;

    // Wake a little late; the re-arm is still due + interval, not now +
    // interval, so the schedule does not drift.
    h.clock.advance(Duration::from_millis(150));
    let events = h.fire_one().await;

    assert!(matches!(
        &events[0],
        Event::TimerFired { timestamp, .. } if *timestamp == first_due + 1_000
    ));
    let row = h.runtime.get_timer(&record.id).unwrap();
    assert_eq!(row.loops, 1);
    assert_eq!(row.due_at_ms, first_due + 1_000);
    assert_eq!(h.runtime.next_due_ms(), Some(first_due + 1_000));
}

#[tokio::test]
async fn looping_timer_fires_until_loops_exhausted() {
    let mut h = harness();
    h.runtime.recover();
    h.create(CreateTimer {
        loops: 2,
        interval_ms: 1_000,
        ..create_cmd(100, &h.clock)
    });

    h.clock.advance(Duration::from_millis(100));
    h.fire_one().await;
    h.clock.advance(Duration::from_millis(1_000));
    h.fire_one().await;
    h.clock.advance(Duration::from_millis(1_000));
    let events = h.fire_one().await;

    // loops=2 means two re-arms after the first firing
    assert_eq!(h.invoker.calls().len(), 3);
    assert!(matches!(&events[0], Event::TimerFinished { error: None, .. }));
    assert_eq!(h.runtime.status().timers, 0);
}

#[tokio::test]
async fn failure_schedules_retry_at_now_plus_delay() {
    let mut h = harness();
    h.runtime.recover();
    let record = h.create(CreateTimer {
        max_retries: 2,
        retry_delay_ms: Some(500),
        ..create_cmd(100, &h.clock)
    });
    h.invoker.fail_next("downstream unavailable");

    h.clock.advance(Duration::from_millis(100));
    let events = h.fire_one().await;

    let retry_due = h.clock.epoch_ms() + 500;
    assert!(matches!(
        &events[0],
        Event::TimerFailed { timestamp, error, .. }
            if *timestamp == retry_due && error == "downstream unavailable"
    ));
    let row = h.runtime.get_timer(&record.id).unwrap();
    assert_eq!(row.retries, 1);
    assert_eq!(row.due_at_ms, retry_due);
    assert_eq!(h.runtime.next_due_ms(), Some(retry_due));
}

#[tokio::test]
async fn retries_exhaust_into_finished_with_error() {
    let mut h = harness();
    h.runtime.recover();
    h.create(CreateTimer {
        max_retries: 2,
        retry_delay_ms: Some(100),
        ..create_cmd(100, &h.clock)
    });
    for _ in 0..3 {
        h.invoker.fail_next("boom");
    }

    // maxRetries=2: two timerFailed retries, then terminal finish
    h.clock.advance(Duration::from_millis(100));
    let first = h.fire_one().await;
    assert!(matches!(&first[0], Event::TimerFailed { .. }));

    h.clock.advance(Duration::from_millis(100));
    let second = h.fire_one().await;
    assert!(matches!(&second[0], Event::TimerFailed { .. }));

    h.clock.advance(Duration::from_millis(100));
    let third = h.fire_one().await;
    assert!(matches!(
        &third[0],
        Event::TimerFinished { error: Some(e), .. } if e == "boom"
    ));
    assert_eq!(h.runtime.status().timers, 0);
}

#[tokio::test]
async fn success_after_failure_keeps_counting_loops() {
    let mut h = harness();
    h.runtime.recover();
    let record = h.create(CreateTimer {
        loops: 1,
        interval_ms: 1_000,
        max_retries: 3,
        retry_delay_ms: Some(100),
        ..create_cmd(100, &h.clock)
    });
    h.invoker.fail_next("flaky");

    h.clock.advance(Duration::from_millis(100));
    h.fire_one().await;
    h.clock.advance(Duration::from_millis(100));
    let events = h.fire_one().await;

    // The retry succeeded: re-armed from the retry due timestamp
    let row = h.runtime.get_timer(&record.id).unwrap();
    assert!(matches!(&events[0], Event::TimerFired { .. }));
    assert_eq!(row.loops, 0);
    assert_eq!(row.retries, 1);
}

#[tokio::test]
async fn outcome_for_canceled_timer_is_dropped() {
    let mut h = harness();
    h.runtime.recover();
    let record = h.create(create_cmd(100, &h.clock));

    h.clock.advance(Duration::from_millis(100));
    assert_eq!(h.runtime.drain_due(), 1);

    // Cancel lands while the action is in flight
    let events = h
        .runtime
        .handle_cancel(&record.id, Origin::default())
        .unwrap();
    for event in &events {
        h.runtime.apply_event(event);
    }

    let outcome = h.outcome_rx.recv().await.unwrap();
    assert!(h.runtime.handle_outcome(&outcome).is_empty());
    assert_eq!(h.runtime.status().timers, 0);
}

#[tokio::test]
async fn drain_fires_all_due_timers() {
    let h = harness();
    h.runtime.recover();
    h.create(create_cmd(100, &h.clock));
    h.create(create_cmd(200, &h.clock));
    h.create(create_cmd(5_000, &h.clock));

    h.clock.advance(Duration::from_millis(300));
    assert_eq!(h.runtime.drain_due(), 2);
    assert_eq!(h.runtime.status().window, 1);
}

#[tokio::test]
async fn drain_before_deadline_fires_nothing() {
    let h = harness();
    h.runtime.recover();
    h.create(create_cmd(500, &h.clock));

    assert_eq!(h.runtime.drain_due(), 0);
    assert!(h.invoker.calls().is_empty());
}
