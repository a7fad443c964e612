// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake action invoker for testing

use super::{ActionInvoker, InvokeError};
use async_trait::async_trait;
use chime_core::{TimerAction, TimerId, TimerRecord};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Recorded invocation
#[derive(Debug, Clone)]
pub struct InvokeCall {
    pub timer: TimerId,
    pub action: TimerAction,
}

struct FakeInvokerState {
    calls: Vec<InvokeCall>,
    /// Scripted outcomes, consumed front to back; empty means succeed
    failures: VecDeque<Option<String>>,
}

/// Fake invoker that records calls and can be scripted to fail.
#[derive(Clone)]
pub struct FakeInvoker {
    inner: Arc<Mutex<FakeInvokerState>>,
}

impl Default for FakeInvoker {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeInvokerState {
                calls: Vec::new(),
                failures: VecDeque::new(),
            })),
        }
    }
}

impl FakeInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next invocation to fail with the given message.
    pub fn fail_next(&self, error: &str) {
        self.inner.lock().failures.push_back(Some(error.to_string()));
    }

    /// Script the next invocation to succeed (useful between failures).
    pub fn succeed_next(&self) {
        self.inner.lock().failures.push_back(None);
    }

    /// Get all recorded invocations
    pub fn calls(&self) -> Vec<InvokeCall> {
        self.inner.lock().calls.clone()
    }
}

#[async_trait]
impl ActionInvoker for FakeInvoker {
    async fn invoke(&self, record: &TimerRecord) -> Result<(), InvokeError> {
        let mut state = self.inner.lock();
        state.calls.push(InvokeCall {
            timer: record.id.clone(),
            action: record.action.clone(),
        });
        match state.failures.pop_front() {
            Some(Some(error)) => Err(InvokeError::Failed(error)),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
