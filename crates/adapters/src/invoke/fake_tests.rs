// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chime_core::{Origin, TimerAction, TimerId, TimerRecord};

fn record(id: &str) -> TimerRecord {
    TimerRecord {
        id: TimerId::new(id),
        due_at_ms: 0,
        action: TimerAction::Call {
            service: "mailer".to_string(),
            payload: serde_json::json!({"to": "ops"}),
        },
        loops: 1,
        interval_ms: 0,
        retries: 0,
        max_retries: 0,
        retry_delay_ms: 25_000,
        origin: Origin::default(),
    }
}

#[tokio::test]
async fn fake_records_calls() {
    let invoker = FakeInvoker::new();

    invoker.invoke(&record("a")).await.unwrap();
    invoker.invoke(&record("b")).await.unwrap();

    let calls = invoker.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].timer, "a");
    assert_eq!(calls[0].action.service(), Some("mailer"));
}

#[tokio::test]
async fn scripted_failures_consume_in_order() {
    let invoker = FakeInvoker::new();
    invoker.fail_next("downstream unavailable");
    invoker.succeed_next();
    invoker.fail_next("still down");

    let err = invoker.invoke(&record("a")).await.unwrap_err();
    assert!(matches!(err, InvokeError::Failed(msg) if msg == "downstream unavailable"));

    assert!(invoker.invoke(&record("a")).await.is_ok());
    assert!(invoker.invoke(&record("a")).await.is_err());
    // Script exhausted, back to succeeding
    assert!(invoker.invoke(&record("a")).await.is_ok());
}
