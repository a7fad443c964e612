// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op action invoker.

use super::{ActionInvoker, InvokeError};
use async_trait::async_trait;
use chime_core::TimerRecord;

/// Invoker that silently accepts every action.
///
/// Used for timers whose firings are observed purely through the event
/// log, and as the default when no downstream service is wired up.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpInvoker;

impl NoOpInvoker {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ActionInvoker for NoOpInvoker {
    async fn invoke(&self, _record: &TimerRecord) -> Result<(), InvokeError> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "noop_tests.rs"]
mod tests;
