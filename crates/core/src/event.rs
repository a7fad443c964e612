// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event types for the chime timer service.
//!
//! Events are the durable record of every timer state transition. They
//! are appended to the WAL before the in-memory state change is
//! considered committed, and replaying them against the timer table
//! reconstructs the persisted backlog.

use crate::timer::{Origin, TimerId, TimerRecord};
use serde::{Deserialize, Serialize};

/// Events that drive state transitions in the timer service.
///
/// Serializes with `{"type": "timer:created", ...fields}` format.
/// Unknown type tags deserialize to `Custom`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A timer was created; carries the full normalized record
    #[serde(rename = "timer:created")]
    TimerCreated { timer: TimerId, data: TimerRecord },

    /// A timer was cancelled before finishing
    #[serde(rename = "timer:canceled")]
    TimerCanceled {
        timer: TimerId,
        #[serde(default)]
        origin: Origin,
    },

    /// A timer fired successfully and re-armed for `timestamp`
    #[serde(rename = "timer:fired")]
    TimerFired {
        timer: TimerId,
        /// New due timestamp (epoch ms)
        timestamp: u64,
        #[serde(default)]
        origin: Origin,
    },

    /// A firing failed; the timer retries at `timestamp`
    #[serde(rename = "timer:failed")]
    TimerFailed {
        timer: TimerId,
        /// Retry due timestamp (epoch ms)
        timestamp: u64,
        error: String,
        #[serde(default)]
        origin: Origin,
    },

    /// A timer finished permanently, with an error if retries were exhausted
    #[serde(rename = "timer:finished")]
    TimerFinished {
        timer: TimerId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(default)]
        origin: Origin,
    },

    // -- system --
    #[serde(rename = "system:shutdown")]
    Shutdown,

    /// Catch-all for unknown event types (extensibility)
    #[serde(other, skip_serializing)]
    Custom,
}

impl Event {
    pub fn name(&self) -> &str {
        match self {
            Event::TimerCreated { .. } => "timer:created",
            Event::TimerCanceled { .. } => "timer:canceled",
            Event::TimerFired { .. } => "timer:fired",
            Event::TimerFailed { .. } => "timer:failed",
            Event::TimerFinished { .. } => "timer:finished",
            Event::Shutdown => "system:shutdown",
            Event::Custom => "custom",
        }
    }

    /// The timer this event belongs to, if any.
    pub fn timer_id(&self) -> Option<&TimerId> {
        match self {
            Event::TimerCreated { timer, .. }
            | Event::TimerCanceled { timer, .. }
            | Event::TimerFired { timer, .. }
            | Event::TimerFailed { timer, .. }
            | Event::TimerFinished { timer, .. } => Some(timer),
            Event::Shutdown | Event::Custom => None,
        }
    }

    pub fn log_summary(&self) -> String {
        let t = self.name();
        match self {
            Event::TimerCreated { timer, data } => {
                format!("{t} id={timer} due={} loops={}", data.due_at_ms, data.loops)
            }
            Event::TimerCanceled { timer, .. } => format!("{t} id={timer}"),
            Event::TimerFired { timer, timestamp, .. } => {
                format!("{t} id={timer} next={timestamp}")
            }
            Event::TimerFailed {
                timer,
                timestamp,
                error,
                ..
            } => format!("{t} id={timer} retry={timestamp} error={error}"),
            Event::TimerFinished { timer, error, .. } => match error {
                Some(e) => format!("{t} id={timer} error={e}"),
                None => format!("{t} id={timer}"),
            },
            Event::Shutdown | Event::Custom => t.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
