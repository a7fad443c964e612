// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Firing and the retry/backoff state machine
//!
//! Draining pops every due timer and launches its action without
//! awaiting it, so one hung action never stalls the loop. Completions
//! come back as `FiringOutcome` messages; turning an outcome into
//! events happens on the loop, against the row's current state, which
//! makes a cancel-during-firing race resolve to a clean no-op.

use super::Runtime;
use chime_adapters::ActionInvoker;
use chime_core::{Clock, Event, IdGen, TimerId};

/// Completion of one asynchronous action invocation
#[derive(Debug)]
pub struct FiringOutcome {
    pub timer: TimerId,
    /// `None` on success, the failure message otherwise
    pub error: Option<String>,
}

impl<I, C, G> Runtime<I, C, G>
where
    I: ActionInvoker,
    C: Clock,
    G: IdGen,
{
    /// Pop all due timers and launch their actions. Returns how many
    /// firings were started.
    pub fn drain_due(&self) -> usize {
        let now_ms = self.clock.epoch_ms();
        let due = self.window.lock().pop_due(now_ms);
        let mut started = 0;

        for id in due {
            let Some(record) = self.table.lock().get(&id).cloned() else {
                // Row deleted between scheduling and drain
                continue;
            };
            tracing::debug!(timer = %id, due_at_ms = record.due_at_ms, "firing");

            let invoker = self.invoker.clone();
            let outcome_tx = self.outcome_tx.clone();
            tokio::spawn(async move {
                let error = invoker.invoke(&record).await.err().map(|e| e.to_string());
                let outcome = FiringOutcome {
                    timer: record.id,
                    error,
                };
                if outcome_tx.send(outcome).await.is_err() {
                    tracing::warn!("firing outcome dropped, runtime shutting down");
                }
            });
            started += 1;
        }
        started
    }

    /// Turn a firing completion into follow-up events.
    ///
    /// Success decrements the remaining loops; when they go negative
    /// the timer is finished, otherwise it re-arms at `dueAt + interval`
    /// (phase-locked to its schedule). Failure increments the retry
    /// count; past `max_retries` the timer finishes carrying the error,
    /// otherwise it retries at `now + retry_delay`.
    pub fn handle_outcome(&self, outcome: &FiringOutcome) -> Vec<Event> {
        let Some(record) = self.table.lock().get(&outcome.timer).cloned() else {
            // Canceled while the action was in flight
            tracing::debug!(timer = %outcome.timer, "outcome for deleted timer, ignoring");
            return vec![];
        };
        let origin = record.origin.clone();

        match &outcome.error {
            None => {
                if record.loops - 1 < 0 {
                    tracing::info!(timer = %record.id, "timer finished");
                    vec![Event::TimerFinished {
                        timer: record.id,
                        error: None,
                        origin,
                    }]
                } else {
                    let next_due = record.due_at_ms + record.interval_ms;
                    tracing::debug!(timer = %record.id, next_due, "timer fired, re-arming");
                    vec![Event::TimerFired {
                        timer: record.id,
                        timestamp: next_due,
                        origin,
                    }]
                }
            }
            Some(error) => {
                if record.retries + 1 > record.max_retries {
                    tracing::warn!(timer = %record.id, error, "retries exhausted");
                    vec![Event::TimerFinished {
                        timer: record.id,
                        error: Some(error.clone()),
                        origin,
                    }]
                } else {
                    let retry_due = self.clock.epoch_ms() + record.retry_delay_ms;
                    tracing::warn!(timer = %record.id, error, retry_due, "firing failed, retrying");
                    vec![Event::TimerFailed {
                        timer: record.id,
                        timestamp: retry_due,
                        error: error.clone(),
                        origin,
                    }]
                }
            }
        }
    }
}
