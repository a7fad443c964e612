// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::timer::TimerAction;
use yare::parameterized;

fn record(id: &str, due_at_ms: u64) -> TimerRecord {
    TimerRecord {
        id: TimerId::new(id),
        due_at_ms,
        action: TimerAction::None,
        loops: 2,
        interval_ms: 1000,
        retries: 0,
        max_retries: 0,
        retry_delay_ms: 25_000,
        origin: Origin::from_command("cmd-1"),
    }
}

#[test]
fn created_event_serializes_with_type_tag() {
    let event = Event::TimerCreated {
        timer: TimerId::new("t-1"),
        data: record("t-1", 500),
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "timer:created");
    assert_eq!(json["timer"], "t-1");
    assert_eq!(json["data"]["due_at_ms"], 500);

    let back: Event = serde_json::from_value(json).unwrap();
    assert_eq!(back, event);
}

#[test]
fn unknown_event_type_deserializes_to_custom() {
    let event: Event =
        serde_json::from_str(r#"{"type":"timer:defrosted","timer":"t-9"}"#).unwrap();
    assert_eq!(event, Event::Custom);
}

#[parameterized(
    canceled = { Event::TimerCanceled { timer: TimerId::new("t"), origin: Origin::default() }, "timer:canceled" },
    fired = { Event::TimerFired { timer: TimerId::new("t"), timestamp: 9, origin: Origin::default() }, "timer:fired" },
    failed = { Event::TimerFailed { timer: TimerId::new("t"), timestamp: 9, error: "boom".into(), origin: Origin::default() }, "timer:failed" },
    finished = { Event::TimerFinished { timer: TimerId::new("t"), error: None, origin: Origin::default() }, "timer:finished" },
)]
fn event_names_match_type_tags(event: Event, expected: &str) {
    assert_eq!(event.name(), expected);
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], expected);
}

#[test]
fn timer_id_extraction() {
    let event = Event::TimerFired {
        timer: TimerId::new("t-3"),
        timestamp: 100,
        origin: Origin::default(),
    };
    assert_eq!(event.timer_id(), Some(&TimerId::new("t-3")));
    assert_eq!(Event::Shutdown.timer_id(), None);
}

#[test]
fn finished_summary_includes_error_when_present() {
    let ok = Event::TimerFinished {
        timer: TimerId::new("t"),
        error: None,
        origin: Origin::default(),
    };
    assert_eq!(ok.log_summary(), "timer:finished id=t");

    let failed = Event::TimerFinished {
        timer: TimerId::new("t"),
        error: Some("call refused".to_string()),
        origin: Origin::default(),
    };
    assert_eq!(failed.log_summary(), "timer:finished id=t error=call refused");
}
