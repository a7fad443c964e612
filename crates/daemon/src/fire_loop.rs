// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The fire loop: single applier of durable events and the firing driver.
//!
//! Every select iteration recomputes the sleep from the earliest windowed
//! deadline, so a newly created timer that is due sooner preempts the
//! current sleep via the event-bus wake. The loop stops on a shutdown
//! event, a signal notification, or bus closure.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Notify};
use tracing::{debug, error, info};

use chime_adapters::ActionInvoker;
use chime_core::{Clock, Event, IdGen};
use chime_engine::{FiringOutcome, Runtime};

use crate::event_bus::{EventBus, EventReader};

/// Poll ceiling: sleep at most this long even when nothing is due, so
/// window reloads and clock drift are picked up promptly.
pub const MAX_SLEEP: Duration = Duration::from_millis(1_000);

/// Run the fire loop to completion.
pub async fn run<I, C, G>(
    runtime: Arc<Runtime<I, C, G>>,
    event_bus: EventBus,
    mut event_reader: EventReader,
    mut outcome_rx: mpsc::Receiver<FiringOutcome>,
    shutdown: Arc<Notify>,
) where
    I: ActionInvoker,
    C: Clock,
    G: IdGen,
{
    loop {
        let sleep_for = match runtime.next_due_ms() {
            Some(due) => {
                let now = runtime.clock().epoch_ms();
                Duration::from_millis(due.saturating_sub(now)).min(MAX_SLEEP)
            }
            None => MAX_SLEEP,
        };

        tokio::select! {
            // Apply events from the durable event reader
            result = event_reader.recv() => {
                match result {
                    Ok(Some(entry)) => {
                        let seq = entry.seq;
                        match entry.event {
                            Event::Shutdown => {
                                // Ordered after every command appended
                                // before the shutdown request
                                info!(seq, "shutdown event reached, stopping");
                                event_reader.mark_processed(seq);
                                break;
                            }
                            event => {
                                debug!(seq, "applying {}", event.log_summary());
                                runtime.apply_event(&event);
                                event_reader.mark_processed(seq);
                            }
                        }
                    }
                    Ok(None) => {
                        info!("Event bus closed, shutting down...");
                        break;
                    }
                    Err(e) => {
                        error!("Error reading from WAL: {}", e);
                    }
                }
            }

            // A firing completed: turn the outcome into durable events
            outcome = outcome_rx.recv() => {
                match outcome {
                    Some(outcome) => {
                        let events = runtime.handle_outcome(&outcome);
                        if let Err(e) = event_bus.send_all(&events) {
                            error!("Failed to persist firing outcome: {}", e);
                        }
                    }
                    None => {
                        info!("Outcome channel closed, shutting down...");
                        break;
                    }
                }
            }

            // Shutdown requested by a signal handler
            _ = shutdown.notified() => {
                info!("Shutdown signal received, stopping");
                break;
            }

            // Deadline reached (or poll ceiling): fire what is due and
            // top up the window when the horizon is getting close.
            _ = tokio::time::sleep(sleep_for) => {
                runtime.drain_due();
                runtime.maybe_reload();
            }
        }
    }
}

#[cfg(test)]
#[path = "fire_loop_tests.rs"]
mod tests;
