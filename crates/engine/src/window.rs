// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The in-memory scheduling window.
//!
//! An ordered cache of timers due before the current horizon. Ordering
//! lives in a binary min-heap keyed on due timestamp; membership lives
//! in a companion id map so inserts are idempotent under overlapping
//! reloads. Removal is lazy: a cancel only drops the id from the map,
//! and the matching heap entry is skipped when it surfaces.

use chime_core::TimerId;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Heap entry: (due, insertion seq, id). The seq keeps pops stable for
/// entries sharing a due timestamp.
type Entry = Reverse<(u64, u64, TimerId)>;

/// Min-heap of timers ordered by due timestamp, with an id map for
/// idempotent membership.
#[derive(Debug, Default)]
pub struct SchedulingWindow {
    heap: BinaryHeap<Entry>,
    /// id -> due timestamp of the live entry; heap entries that do not
    /// match are stale and get skipped
    tracked: HashMap<TimerId, u64>,
    next_seq: u64,
}

impl SchedulingWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a timer. A no-op if the id is already tracked, so
    /// overlapping reload pages and write-through never duplicate.
    /// Returns whether the entry was actually added.
    pub fn insert(&mut self, id: TimerId, due_at_ms: u64) -> bool {
        if self.tracked.contains_key(&id) {
            return false;
        }
        self.tracked.insert(id.clone(), due_at_ms);
        self.heap.push(Reverse((due_at_ms, self.next_seq, id)));
        self.next_seq += 1;
        true
    }

    /// Replace a timer's due entry, used when a firing re-arms it.
    pub fn reschedule(&mut self, id: TimerId, due_at_ms: u64) {
        // Stale heap entry (if any) is skipped once the map disagrees
        self.tracked.insert(id.clone(), due_at_ms);
        self.heap.push(Reverse((due_at_ms, self.next_seq, id)));
        self.next_seq += 1;
    }

    /// Drop a timer from the window. The heap entry stays behind and is
    /// discarded lazily.
    pub fn remove(&mut self, id: &TimerId) {
        self.tracked.remove(id);
    }

    pub fn contains(&self, id: &TimerId) -> bool {
        self.tracked.contains_key(id)
    }

    /// Number of live (tracked) entries.
    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }

    /// Due timestamp of the earliest live entry.
    pub fn next_due(&mut self) -> Option<u64> {
        self.skim_stale();
        self.heap.peek().map(|Reverse((due, _, _))| *due)
    }

    /// Pop every timer with `due_at_ms <= now`, earliest first.
    /// Popped timers leave the tracking map; a later re-arm reinserts.
    pub fn pop_due(&mut self, now_ms: u64) -> Vec<TimerId> {
        let mut due = Vec::new();
        loop {
            self.skim_stale();
            match self.heap.peek() {
                Some(Reverse((ts, _, _))) if *ts <= now_ms => {
                    if let Some(Reverse((_, _, id))) = self.heap.pop() {
                        self.tracked.remove(&id);
                        due.push(id);
                    }
                }
                _ => break,
            }
        }
        due
    }

    /// Discard heap entries whose id is gone or whose due no longer
    /// matches the tracking map.
    fn skim_stale(&mut self) {
        while let Some(Reverse((due, _, id))) = self.heap.peek() {
            match self.tracked.get(id) {
                Some(live_due) if live_due == due => break,
                _ => {
                    self.heap.pop();
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "window_tests.rs"]
mod tests;
