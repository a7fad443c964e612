// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! chime-core: Domain types for the chime timer service

pub mod clock;
pub mod command;
pub mod event;
pub mod id;
pub mod timer;

pub use clock::{Clock, SystemClock};
pub use command::{CommandError, CreateTimer, DEFAULT_RETRY_DELAY_MS};
pub use event::Event;
pub use id::{IdGen, UuidIdGen};
pub use timer::{Origin, TimerAction, TimerId, TimerRecord};

#[cfg(any(test, feature = "test-support"))]
pub use clock::FakeClock;
#[cfg(any(test, feature = "test-support"))]
pub use id::SequentialIdGen;
