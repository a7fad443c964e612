// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Action invocation adapters
//!
//! A timer's action fires by handing its payload to downstream service
//! plumbing. The invoker trait is the seam: the engine drives it, the
//! daemon picks the implementation.

mod noop;
mod traced;

pub use noop::NoOpInvoker;
pub use traced::TracedInvoker;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeInvoker, InvokeCall};

use async_trait::async_trait;
use chime_core::TimerRecord;
use thiserror::Error;

/// Errors from action invocation
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("invoke failed: {0}")]
    Failed(String),
    #[error("no service configured for action")]
    NoService,
}

/// Adapter for delivering a firing timer's action
#[async_trait]
pub trait ActionInvoker: Clone + Send + Sync + 'static {
    /// Deliver the timer's action payload downstream
    async fn invoke(&self, record: &TimerRecord) -> Result<(), InvokeError>;
}
