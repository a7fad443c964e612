// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::invoke::FakeInvoker;
use chime_core::{Origin, TimerAction, TimerId, TimerRecord};

fn record(id: &str) -> TimerRecord {
    TimerRecord {
        id: TimerId::new(id),
        due_at_ms: 0,
        action: TimerAction::None,
        loops: 1,
        interval_ms: 0,
        retries: 0,
        max_retries: 0,
        retry_delay_ms: 25_000,
        origin: Origin::default(),
    }
}

#[tokio::test]
async fn traced_passes_through_success() {
    let fake = FakeInvoker::new();
    let traced = TracedInvoker::new(fake.clone());

    traced.invoke(&record("t1")).await.unwrap();
    assert_eq!(fake.calls().len(), 1);
}

#[tokio::test]
async fn traced_passes_through_error() {
    let fake = FakeInvoker::new();
    fake.fail_next("boom");
    let traced = TracedInvoker::new(fake.clone());

    let err = traced.invoke(&record("t1")).await.unwrap_err();
    assert!(matches!(err, InvokeError::Failed(msg) if msg == "boom"));
}
