// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Windowed reload protocol
//!
//! The table may hold far more timers than fit in memory, so the window
//! only ever covers `[.., horizon)` and is refilled one page at a time.
//! Pages use a `(due, id)` cursor, so a run of timers sharing a due
//! timestamp longer than one page still makes progress.

use super::Runtime;
use chime_adapters::ActionInvoker;
use chime_core::{Clock, IdGen, TimerId};

impl<I, C, G> Runtime<I, C, G>
where
    I: ActionInvoker,
    C: Clock,
    G: IdGen,
{
    /// Startup recovery: load everything due before `now + window`,
    /// overdue backlog included, and set the initial horizon.
    ///
    /// Returns how many timers were inserted.
    pub fn recover(&self) -> usize {
        let now_ms = self.clock.epoch_ms();
        let horizon = now_ms + self.config.window_duration_ms;
        let inserted = self.fill_window(0, horizon);
        *self.horizon_ms.lock() = horizon;
        tracing::info!(inserted, horizon, "scheduling window recovered");
        inserted
    }

    /// Steady-state refill: once less than half a window of loaded range
    /// remains, extend the horizon window by window until it is
    /// comfortably ahead of now.
    ///
    /// Returns whether any timer was inserted, so the caller can wake
    /// the fire loop.
    pub fn maybe_reload(&self) -> bool {
        let now_ms = self.clock.epoch_ms();
        let mut inserted = 0;

        loop {
            let horizon = *self.horizon_ms.lock();
            if horizon.saturating_sub(now_ms) >= self.config.load_more_after_ms() {
                break;
            }
            let next_horizon = horizon + self.config.window_duration_ms;
            inserted += self.fill_window(horizon, next_horizon);
            *self.horizon_ms.lock() = next_horizon;
        }

        if inserted > 0 {
            tracing::debug!(inserted, "window refilled");
        }
        inserted > 0
    }

    /// Page rows with `lo <= due < hi` into the window. Insertion is
    /// idempotent, so overlap with write-through or a previous page is
    /// harmless.
    fn fill_window(&self, lo: u64, hi: u64) -> usize {
        // Ids are never empty, so (lo, "") sorts before every real row
        // at lo and an exclusive cursor starts the page at lo inclusive.
        let mut cursor = (lo > 0).then(|| (lo, TimerId::new("")));
        let mut inserted = 0;

        loop {
            let page = {
                let table = self.table.lock();
                table.page_due(
                    cursor.as_ref().map(|(due, id)| (*due, id)),
                    hi,
                    self.config.page_size,
                )
            };
            let Some(last) = page.last() else { break };
            cursor = Some((last.due_at_ms, last.id.clone()));
            let page_full = page.len() == self.config.page_size;

            let mut window = self.window.lock();
            for record in page {
                if window.insert(record.id, record.due_at_ms) {
                    inserted += 1;
                }
            }
            drop(window);

            if !page_full {
                break;
            }
        }
        inserted
    }
}
