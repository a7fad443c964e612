// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timer records: the unit of scheduling.
//!
//! A [`TimerRecord`] describes one future action together with its
//! re-firing and retry policy. Records are persisted in the timer table
//! and cached in the in-memory scheduling window while their due
//! timestamp is near.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Unique identifier for a timer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerId(pub String);

impl TimerId {
    /// Create a new TimerId from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the string value of this TimerId.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TimerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TimerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl PartialEq<str> for TimerId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for TimerId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Borrow<str> for TimerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// What a timer does when it fires.
///
/// Exactly one kind is active per record. `None` fires as an immediate
/// success without calling anything.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimerAction {
    /// No-op fire
    #[default]
    None,

    /// Call a named service with a payload
    Call {
        service: String,
        payload: serde_json::Value,
    },

    /// Fire a named trigger, optionally scoped to a service
    Trigger {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        service: Option<String>,
    },
}

impl TimerAction {
    /// True if firing this action performs no external work.
    pub fn is_none(&self) -> bool {
        matches!(self, TimerAction::None)
    }

    /// The target service, if the action is directed at one.
    pub fn service(&self) -> Option<&str> {
        match self {
            TimerAction::None => None,
            TimerAction::Call { service, .. } => Some(service),
            TimerAction::Trigger { service, .. } => service.as_deref(),
        }
    }
}

/// Correlation metadata tracing a timer back to the request that created it.
///
/// Propagated onto every event the timer emits and into action invocations.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Origin {
    /// Id of the command that created the timer, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_id: Option<String>,
}

impl Origin {
    pub fn from_command(command_id: impl Into<String>) -> Self {
        Self {
            command_id: Some(command_id.into()),
        }
    }

    /// Correlation key for emitted events. Falls back to the service's
    /// own name when the creating command is unknown.
    pub fn correlation(&self) -> &str {
        self.command_id.as_deref().unwrap_or("timer")
    }
}

/// A persisted timer: one future action plus its re-firing/retry policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerRecord {
    pub id: TimerId,

    /// Epoch milliseconds at which the timer next fires
    pub due_at_ms: u64,

    #[serde(default)]
    pub action: TimerAction,

    /// Re-arm counter: `0` fires once, `n > 0` fires then re-arms `n`
    /// more times, negative means no firings remain.
    #[serde(default)]
    pub loops: i64,

    /// Added to `due_at_ms` when re-arming after a successful fire.
    /// Non-zero whenever `loops > 0` (validated at creation).
    #[serde(default)]
    pub interval_ms: u64,

    /// Consecutive action failures since the last success
    #[serde(default)]
    pub retries: u32,

    /// Failure ceiling; exceeding it finishes the timer with an error
    #[serde(default)]
    pub max_retries: u32,

    /// Added to "now" to compute the retry due timestamp after a failure
    #[serde(default)]
    pub retry_delay_ms: u64,

    #[serde(default)]
    pub origin: Origin,
}

impl TimerRecord {
    /// True once no firings remain.
    pub fn is_finished(&self) -> bool {
        self.loops < 0
    }
}

#[cfg(test)]
#[path = "timer_tests.rs"]
mod tests;
