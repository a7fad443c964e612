// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime for the chime scheduling engine
//!
//! The runtime owns the scheduling window and the event-application
//! path. Command handlers and the firing state machine produce events;
//! the daemon persists them and feeds them back through `apply_event`,
//! so the in-memory structures never get ahead of the log.

mod command;
mod fire;
mod reload;

use crate::window::SchedulingWindow;
use chime_adapters::ActionInvoker;
use chime_core::{Clock, Event, IdGen, TimerId};
use chime_storage::TimerTable;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;

pub use fire::FiringOutcome;

/// Default scheduling window span (10 minutes)
pub const DEFAULT_WINDOW_DURATION_MS: u64 = 10 * 60 * 1000;

/// Default reload page size
pub const DEFAULT_PAGE_SIZE: usize = 1024;

/// Runtime tuning configuration
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Span of the scheduling window in milliseconds
    pub window_duration_ms: u64,
    /// Maximum rows fetched per reload page
    pub page_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            window_duration_ms: DEFAULT_WINDOW_DURATION_MS,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl RuntimeConfig {
    /// Reload threshold: refill once less than half the window remains.
    pub fn load_more_after_ms(&self) -> u64 {
        self.window_duration_ms / 2
    }
}

/// Point-in-time runtime counters for the status request
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeStatus {
    pub timers: usize,
    pub window: usize,
    pub horizon_ms: u64,
    pub next_due_ms: Option<u64>,
}

/// Runtime that coordinates the scheduling window, firing, and reloads
pub struct Runtime<I, C: Clock, G: IdGen> {
    pub(crate) invoker: I,
    pub(crate) clock: C,
    pub(crate) id_gen: G,
    pub(crate) config: RuntimeConfig,
    pub(crate) table: Arc<Mutex<TimerTable>>,
    pub(crate) window: Mutex<SchedulingWindow>,
    /// Exclusive upper bound of the loaded range
    pub(crate) horizon_ms: Mutex<u64>,
    pub(crate) outcome_tx: mpsc::Sender<FiringOutcome>,
}

impl<I, C, G> Runtime<I, C, G>
where
    I: ActionInvoker,
    C: Clock,
    G: IdGen,
{
    /// Create a new runtime over a shared timer table.
    pub fn new(
        invoker: I,
        clock: C,
        id_gen: G,
        config: RuntimeConfig,
        table: Arc<Mutex<TimerTable>>,
        outcome_tx: mpsc::Sender<FiringOutcome>,
    ) -> Self {
        Self {
            invoker,
            clock,
            id_gen,
            config,
            table,
            window: Mutex::new(SchedulingWindow::new()),
            horizon_ms: Mutex::new(0),
            outcome_tx,
        }
    }

    /// Get a reference to the clock
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Apply a persisted event to the table and the window.
    ///
    /// Must only run after the event is durably appended. Window
    /// membership tracks the invariant: present iff persisted, not
    /// cancelled or finished, and due before the horizon.
    pub fn apply_event(&self, event: &Event) {
        self.table.lock().apply_event(event);
        match event {
            Event::TimerCreated { data, .. } => {
                if data.due_at_ms < *self.horizon_ms.lock() {
                    self.window.lock().insert(data.id.clone(), data.due_at_ms);
                }
            }
            Event::TimerCanceled { timer, .. } | Event::TimerFinished { timer, .. } => {
                self.window.lock().remove(timer);
            }
            Event::TimerFired {
                timer, timestamp, ..
            }
            | Event::TimerFailed {
                timer, timestamp, ..
            } => {
                if *timestamp < *self.horizon_ms.lock() {
                    self.window.lock().reschedule(timer.clone(), *timestamp);
                }
            }
            Event::Shutdown | Event::Custom => {}
        }
    }

    /// Due timestamp of the earliest windowed timer.
    pub fn next_due_ms(&self) -> Option<u64> {
        self.window.lock().next_due()
    }

    /// Whether the window holds any live entries.
    pub fn window_is_empty(&self) -> bool {
        self.window.lock().is_empty()
    }

    /// Counters for the status request.
    pub fn status(&self) -> RuntimeStatus {
        // Bind each counter before building the struct: temporaries in a
        // struct literal live to the end of the statement, so chaining the
        // lock guards there would still hold `window` when `next_due_ms`
        // re-locks it.
        let timers = self.table.lock().len();
        let window = self.window.lock().len();
        let horizon_ms = *self.horizon_ms.lock();
        let next_due_ms = self.next_due_ms();
        RuntimeStatus {
            timers,
            window,
            horizon_ms,
            next_due_ms,
        }
    }

    /// Look up a timer row by id.
    pub fn get_timer(&self, id: &TimerId) -> Option<chime_core::TimerRecord> {
        self.table.lock().get(id).cloned()
    }
}

#[cfg(test)]
#[path = "../runtime_tests/mod.rs"]
mod tests;
