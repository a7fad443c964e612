// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

mod command;
mod fire;
mod reload;

use super::*;
use chime_adapters::FakeInvoker;
use chime_core::{CreateTimer, FakeClock, SequentialIdGen, TimerRecord};
use std::time::Duration;

struct Harness {
    runtime: Runtime<FakeInvoker, FakeClock, SequentialIdGen>,
    invoker: FakeInvoker,
    clock: FakeClock,
    outcome_rx: mpsc::Receiver<FiringOutcome>,
}

fn harness() -> Harness {
    harness_with(RuntimeConfig::default())
}

fn harness_with(config: RuntimeConfig) -> Harness {
    let invoker = FakeInvoker::new();
    let clock = FakeClock::new();
    let (outcome_tx, outcome_rx) = mpsc::channel(64);
    let runtime = Runtime::new(
        invoker.clone(),
        clock.clone(),
        SequentialIdGen::default(),
        config,
        Arc::new(Mutex::new(TimerTable::new())),
        outcome_tx,
    );
    Harness {
        runtime,
        invoker,
        clock,
        outcome_rx,
    }
}

impl Harness {
    /// Create a timer and apply its events, as the daemon would after a
    /// durable append.
    fn create(&self, cmd: CreateTimer) -> TimerRecord {
        let (record, events) = self.runtime.handle_create(cmd).unwrap();
        for event in &events {
            self.runtime.apply_event(event);
        }
        record
    }

    /// Drain, then run the next firing outcome through the state machine
    /// and apply the resulting events.
    async fn fire_one(&mut self) -> Vec<Event> {
        assert_eq!(self.runtime.drain_due(), 1);
        let outcome = self.outcome_rx.recv().await.unwrap();
        let events = self.runtime.handle_outcome(&outcome);
        for event in &events {
            self.runtime.apply_event(event);
        }
        events
    }
}

fn create_cmd(due_in_ms: u64, clock: &FakeClock) -> CreateTimer {
    CreateTimer {
        due_at_ms: clock.epoch_ms() + due_in_ms,
        ..CreateTimer::default()
    }
}
