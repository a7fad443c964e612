// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timer commands and their validation.

use crate::id::IdGen;
use crate::timer::{Origin, TimerAction, TimerId, TimerRecord};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default retry delay applied when a creation request leaves it unset.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 25_000;

/// Errors returned to command callers.
///
/// These reject the command synchronously: no event is emitted and no
/// state changes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    /// A repeating timer with a zero interval would fire in a busy loop
    #[error("impossible timer: loops > 0 requires a non-zero interval")]
    ImpossibleTimer,

    /// A caller-supplied id collides with a live timer
    #[error("timer already exists: {0}")]
    AlreadyExists(TimerId),

    #[error("timer not found: {0}")]
    NotFound(TimerId),
}

/// Request to create a timer.
///
/// All policy fields are optional; [`CreateTimer::into_record`] applies
/// the documented defaults and assigns an id when the caller supplied
/// none.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CreateTimer {
    /// Epoch milliseconds of the first firing
    pub due_at_ms: u64,

    #[serde(default)]
    pub action: TimerAction,

    /// Number of re-arms after the first firing (0 = one-shot)
    #[serde(default)]
    pub loops: i64,

    #[serde(default)]
    pub interval_ms: u64,

    #[serde(default)]
    pub max_retries: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_delay_ms: Option<u64>,

    /// Caller-supplied id; generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TimerId>,

    #[serde(default)]
    pub origin: Origin,
}

impl CreateTimer {
    /// Check the creation invariant: a repeating timer needs an interval.
    pub fn validate(&self) -> Result<(), CommandError> {
        if self.loops > 0 && self.interval_ms == 0 {
            return Err(CommandError::ImpossibleTimer);
        }
        Ok(())
    }

    /// Validate and normalize into a full record, assigning an id if needed.
    pub fn into_record(self, ids: &impl IdGen) -> Result<TimerRecord, CommandError> {
        self.validate()?;
        Ok(TimerRecord {
            id: self.id.unwrap_or_else(|| TimerId::new(ids.next())),
            due_at_ms: self.due_at_ms,
            action: self.action,
            loops: self.loops,
            interval_ms: self.interval_ms,
            retries: 0,
            max_retries: self.max_retries,
            retry_delay_ms: self.retry_delay_ms.unwrap_or(DEFAULT_RETRY_DELAY_MS),
            origin: self.origin,
        })
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
