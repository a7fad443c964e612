// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction so the scheduler can be driven deterministically in tests.
//!
//! Timers are persisted with epoch-millisecond due timestamps, and all
//! deadline arithmetic works in that unit.

#[cfg(any(test, feature = "test-support"))]
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
#[cfg(any(test, feature = "test-support"))]
use std::time::Duration;

#[cfg(any(test, feature = "test-support"))]
use parking_lot::Mutex;

/// Source of time for the engine.
pub trait Clock: Clone + Send + Sync + 'static {
    /// Wall-clock now as milliseconds since the Unix epoch.
    fn epoch_ms(&self) -> u64;
}

/// Production clock backed by the system time source.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Fake epoch base so test timestamps are stable and readable.
#[cfg(any(test, feature = "test-support"))]
const FAKE_EPOCH_BASE_MS: u64 = 1_700_000_000_000;

/// Manually advanced clock for tests.
#[cfg(any(test, feature = "test-support"))]
#[derive(Clone)]
pub struct FakeClock {
    offset: Arc<Mutex<Duration>>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeClock {
    pub fn new() -> Self {
        Self {
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, duration: Duration) {
        *self.offset.lock() += duration;
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Clock for FakeClock {
    fn epoch_ms(&self) -> u64 {
        FAKE_EPOCH_BASE_MS + self.offset.lock().as_millis() as u64
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
