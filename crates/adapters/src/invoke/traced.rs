// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced invoker wrapper for consistent observability

use super::{ActionInvoker, InvokeError};
use async_trait::async_trait;
use chime_core::TimerRecord;
use tracing::Instrument;

/// Wrapper that adds tracing to any ActionInvoker
#[derive(Clone)]
pub struct TracedInvoker<I> {
    inner: I,
}

impl<I> TracedInvoker<I> {
    pub fn new(inner: I) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<I: ActionInvoker> ActionInvoker for TracedInvoker<I> {
    async fn invoke(&self, record: &TimerRecord) -> Result<(), InvokeError> {
        let span = tracing::info_span!("invoke", timer = %record.id);
        async {
            tracing::debug!(service = record.action.service(), "delivering action");
            let start = std::time::Instant::now();
            let result = self.inner.invoke(record).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(()) => tracing::info!(elapsed_ms, "action delivered"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "invoke failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
