// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The durable timer table, materialized from event replay.
//!
//! Rows are indexed by id and by due timestamp. The due index is what
//! makes windowed reloads cheap: the engine pages rows below a horizon
//! in ascending due order instead of scanning the whole backlog.

use chime_core::{Event, TimerId, TimerRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::ops::Bound;

/// Timer rows materialized from the event log.
///
/// Applying the same event twice is harmless, and updates addressed to
/// rows that no longer exist (a cancel racing an in-flight firing) are
/// benign no-ops.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(
    from = "HashMap<TimerId, TimerRecord>",
    into = "HashMap<TimerId, TimerRecord>"
)]
pub struct TimerTable {
    rows: HashMap<TimerId, TimerRecord>,
    /// Secondary index: (due_at_ms, id), kept in lockstep with `rows`
    by_due: BTreeSet<(u64, TimerId)>,
}

impl From<HashMap<TimerId, TimerRecord>> for TimerTable {
    fn from(rows: HashMap<TimerId, TimerRecord>) -> Self {
        let by_due = rows.values().map(|r| (r.due_at_ms, r.id.clone())).collect();
        Self { rows, by_due }
    }
}

impl From<TimerTable> for HashMap<TimerId, TimerRecord> {
    fn from(table: TimerTable) -> Self {
        table.rows
    }
}

impl TimerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point lookup by id.
    pub fn get(&self, id: &TimerId) -> Option<&TimerRecord> {
        self.rows.get(id)
    }

    pub fn contains(&self, id: &TimerId) -> bool {
        self.rows.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// One page of rows with `due_at_ms < hi`, strictly after the
    /// `(due_at_ms, id)` cursor. Cursor paging stays stable even when
    /// more rows than one page share a due timestamp.
    pub fn page_due(
        &self,
        after: Option<(u64, &TimerId)>,
        hi: u64,
        limit: usize,
    ) -> Vec<TimerRecord> {
        let lower = match after {
            Some((due, id)) => Bound::Excluded((due, id.clone())),
            None => Bound::Unbounded,
        };
        self.by_due
            .range((lower, Bound::Excluded((hi, TimerId::new("")))))
            .take(limit)
            .filter_map(|(_, id)| self.rows.get(id).cloned())
            .collect()
    }

    fn insert(&mut self, record: TimerRecord) {
        if let Some(old) = self.rows.insert(record.id.clone(), record.clone()) {
            self.by_due.remove(&(old.due_at_ms, old.id));
        }
        self.by_due.insert((record.due_at_ms, record.id));
    }

    fn delete(&mut self, id: &TimerId) {
        if let Some(old) = self.rows.remove(id) {
            self.by_due.remove(&(old.due_at_ms, old.id));
        }
    }

    fn reschedule(&mut self, id: &TimerId, due_at_ms: u64, update: impl FnOnce(&mut TimerRecord)) {
        let Some(row) = self.rows.get_mut(id) else {
            // Row already deleted (cancel raced an in-flight firing)
            return;
        };
        let old_due = row.due_at_ms;
        row.due_at_ms = due_at_ms;
        update(row);
        self.by_due.remove(&(old_due, id.clone()));
        self.by_due.insert((due_at_ms, id.clone()));
    }

    /// Apply one event to the table.
    ///
    /// This is the event-to-store projection contract: created inserts,
    /// canceled/finished delete, fired decrements loops and reschedules,
    /// failed increments retries and reschedules.
    pub fn apply_event(&mut self, event: &Event) {
        match event {
            Event::TimerCreated { data, .. } => self.insert(data.clone()),
            Event::TimerCanceled { timer, .. } | Event::TimerFinished { timer, .. } => {
                self.delete(timer)
            }
            Event::TimerFired {
                timer, timestamp, ..
            } => self.reschedule(timer, *timestamp, |row| row.loops -= 1),
            Event::TimerFailed {
                timer, timestamp, ..
            } => self.reschedule(timer, *timestamp, |row| row.retries += 1),
            Event::Shutdown | Event::Custom => {}
        }
    }
}

#[cfg(test)]
#[path = "table_tests.rs"]
mod tests;
