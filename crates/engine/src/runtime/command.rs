// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command handlers: create and cancel
//!
//! Handlers validate and return the events to persist; they never touch
//! the table or window themselves. The daemon appends the events to the
//! log, then routes them back through `apply_event`.

use super::Runtime;
use crate::error::EngineError;
use chime_adapters::ActionInvoker;
use chime_core::{Clock, CommandError, CreateTimer, Event, IdGen, Origin, TimerId, TimerRecord};

impl<I, C, G> Runtime<I, C, G>
where
    I: ActionInvoker,
    C: Clock,
    G: IdGen,
{
    /// Handle a create command.
    ///
    /// Validates the request (a looping timer needs a non-zero interval,
    /// and a caller-supplied id must not collide with a live timer),
    /// normalizes defaults, and returns the created record with its
    /// `TimerCreated` event.
    pub fn handle_create(
        &self,
        cmd: CreateTimer,
    ) -> Result<(TimerRecord, Vec<Event>), EngineError> {
        let record = cmd.into_record(&self.id_gen)?;
        // Ids stay unique across the table and the window. Replaying the
        // created event over a live row would leave the window holding the
        // old due timestamp.
        if self.table.lock().contains(&record.id) {
            return Err(CommandError::AlreadyExists(record.id).into());
        }
        tracing::info!(
            timer = %record.id,
            due_at_ms = record.due_at_ms,
            loops = record.loops,
            correlation = %record.origin.correlation(),
            "timer created"
        );
        let event = Event::TimerCreated {
            timer: record.id.clone(),
            data: record.clone(),
        };
        Ok((record, vec![event]))
    }

    /// Handle a cancel command.
    ///
    /// Fails with `NotFound` when no row exists; a cancel that races an
    /// in-flight firing still wins, since the firing's outcome becomes a
    /// no-op once the row is gone.
    pub fn handle_cancel(
        &self,
        id: &TimerId,
        origin: Origin,
    ) -> Result<Vec<Event>, EngineError> {
        if !self.table.lock().contains(id) {
            return Err(CommandError::NotFound(id.clone()).into());
        }
        tracing::info!(timer = %id, correlation = %origin.correlation(), "timer canceled");
        Ok(vec![Event::TimerCanceled {
            timer: id.clone(),
            origin,
        }])
    }
}
