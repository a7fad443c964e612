// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Chime scheduling engine

mod error;
mod runtime;
mod window;

pub use error::EngineError;
pub use runtime::{FiringOutcome, Runtime, RuntimeConfig, RuntimeStatus};
pub use window::SchedulingWindow;
