// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chime_adapters::FakeInvoker;
use chime_core::{CreateTimer, SequentialIdGen, SystemClock, TimerId};
use chime_engine::{Runtime, RuntimeConfig};
use chime_storage::{TimerTable, Wal};
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::task::JoinHandle;

struct Harness {
    _dir: TempDir,
    runtime: Arc<Runtime<FakeInvoker, SystemClock, SequentialIdGen>>,
    invoker: FakeInvoker,
    event_bus: EventBus,
    loop_task: JoinHandle<()>,
}

fn now_ms() -> u64 {
    Clock::epoch_ms(&SystemClock)
}

fn harness() -> Harness {
    let dir = TempDir::new().unwrap();
    let wal = Wal::open(&dir.path().join("events.wal"), 0).unwrap();
    let (event_bus, event_reader) = EventBus::new(wal);

    let invoker = FakeInvoker::new();
    let (outcome_tx, outcome_rx) = mpsc::channel(8);
    let runtime = Arc::new(Runtime::new(
        invoker.clone(),
        SystemClock,
        SequentialIdGen::default(),
        RuntimeConfig::default(),
        Arc::new(Mutex::new(TimerTable::new())),
        outcome_tx,
    ));
    runtime.recover();

    let loop_task = tokio::spawn(run(
        Arc::clone(&runtime),
        event_bus.clone(),
        event_reader,
        outcome_rx,
        Arc::new(Notify::new()),
    ));

    Harness {
        _dir: dir,
        runtime,
        invoker,
        event_bus,
        loop_task,
    }
}

impl Harness {
    /// Submit a create the way the listener does: durable, then acked.
    fn create(&self, id: &str, due_at_ms: u64) {
        let (_, events) = self
            .runtime
            .handle_create(CreateTimer {
                due_at_ms,
                id: Some(TimerId::new(id)),
                ..CreateTimer::default()
            })
            .unwrap();
        self.event_bus.send_all(&events).unwrap();
        self.event_bus.flush().unwrap();
    }

    /// Poll until the invoker has fired `id`, up to `deadline`.
    async fn fired_within(&self, id: &str, deadline: Duration) -> bool {
        let start = std::time::Instant::now();
        while start.elapsed() < deadline {
            if self.invoker.calls().iter().any(|c| c.timer == id) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

#[tokio::test]
async fn near_timer_preempts_a_longer_sleep() {
    let h = harness();

    // Let the loop settle into a sleep toward the far deadline
    h.create("far", now_ms() + 5_000);
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Due sooner than both the pending sleep and the poll ceiling: the
    // create must wake the loop and shorten the sleep, not wait out the
    // old deadline.
    h.create("near", now_ms() + 150);

    assert!(
        h.fired_within("near", Duration::from_millis(600)).await,
        "near timer did not fire at its own due"
    );
    assert!(h.invoker.calls().iter().all(|c| c.timer != "far"));
}

#[tokio::test]
async fn one_shot_timer_fires_and_finishes() {
    let h = harness();

    h.create("soon", now_ms() + 50);
    assert!(h.fired_within("soon", Duration::from_secs(2)).await);

    // The finished event comes back through the bus and deletes the row
    let start = std::time::Instant::now();
    while h.runtime.get_timer(&TimerId::new("soon")).is_some() {
        assert!(
            start.elapsed() < Duration::from_secs(2),
            "timer never finished"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn shutdown_event_stops_the_loop_after_pending_commands() {
    let mut h = harness();

    h.create("pending", now_ms() + 60_000);
    h.event_bus.send(Event::Shutdown).unwrap();
    h.event_bus.flush().unwrap();

    tokio::time::timeout(Duration::from_secs(1), &mut h.loop_task)
        .await
        .expect("loop did not stop on the shutdown event")
        .unwrap();

    // The create appended before the shutdown was applied first
    assert!(h.runtime.get_timer(&TimerId::new("pending")).is_some());
    assert_eq!(h.event_bus.processed_seq(), 2);
}
