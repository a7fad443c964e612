// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn pop_due_returns_earliest_first() {
    let mut window = SchedulingWindow::new();
    window.insert(TimerId::new("late"), 300);
    window.insert(TimerId::new("early"), 100);
    window.insert(TimerId::new("mid"), 200);

    let due = window.pop_due(250);
    assert_eq!(due, vec![TimerId::new("early"), TimerId::new("mid")]);
    assert_eq!(window.len(), 1);
    assert_eq!(window.next_due(), Some(300));
}

#[test]
fn pop_due_includes_exact_deadline() {
    let mut window = SchedulingWindow::new();
    window.insert(TimerId::new("t"), 100);

    assert!(window.pop_due(99).is_empty());
    assert_eq!(window.pop_due(100), vec![TimerId::new("t")]);
}

#[test]
fn insert_is_idempotent_per_id() {
    let mut window = SchedulingWindow::new();
    assert!(window.insert(TimerId::new("t"), 100));
    assert!(!window.insert(TimerId::new("t"), 500));

    assert_eq!(window.len(), 1);
    // First insert wins
    assert_eq!(window.pop_due(1000), vec![TimerId::new("t")]);
    assert!(window.is_empty());
}

#[test]
fn removed_timer_never_pops() {
    let mut window = SchedulingWindow::new();
    window.insert(TimerId::new("a"), 100);
    window.insert(TimerId::new("b"), 200);
    window.remove(&TimerId::new("a"));

    assert_eq!(window.len(), 1);
    assert_eq!(window.next_due(), Some(200));
    assert_eq!(window.pop_due(1000), vec![TimerId::new("b")]);
}

#[test]
fn reinsert_after_remove_uses_new_due() {
    let mut window = SchedulingWindow::new();
    window.insert(TimerId::new("t"), 100);
    window.remove(&TimerId::new("t"));
    window.insert(TimerId::new("t"), 400);

    // The stale 100 entry must not pop at 200
    assert!(window.pop_due(200).is_empty());
    assert_eq!(window.next_due(), Some(400));
    assert_eq!(window.pop_due(400), vec![TimerId::new("t")]);
}

#[test]
fn reschedule_replaces_due() {
    let mut window = SchedulingWindow::new();
    window.insert(TimerId::new("t"), 100);
    window.reschedule(TimerId::new("t"), 50);

    assert_eq!(window.len(), 1);
    assert_eq!(window.next_due(), Some(50));
    assert_eq!(window.pop_due(60), vec![TimerId::new("t")]);
    assert!(window.is_empty());
}

#[test]
fn ties_pop_in_insertion_order() {
    let mut window = SchedulingWindow::new();
    window.insert(TimerId::new("first"), 100);
    window.insert(TimerId::new("second"), 100);

    let due = window.pop_due(100);
    assert_eq!(due, vec![TimerId::new("first"), TimerId::new("second")]);
}

#[test]
fn next_due_skips_stale_entries() {
    let mut window = SchedulingWindow::new();
    window.insert(TimerId::new("a"), 100);
    window.insert(TimerId::new("b"), 200);
    window.remove(&TimerId::new("a"));

    assert_eq!(window.next_due(), Some(200));
}

#[test]
fn empty_window_has_no_due() {
    let mut window = SchedulingWindow::new();
    assert!(window.is_empty());
    assert_eq!(window.next_due(), None);
    assert!(window.pop_due(u64::MAX).is_empty());
}
