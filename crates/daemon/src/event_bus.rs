// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event bus for daemon communication.
//!
//! The bus appends events to the WAL before the fire loop sees them, so
//! every state change is recoverable via snapshot + replay. Events are
//! buffered and group-committed (~10ms durability window); callers that
//! must reply only after durability call `flush()` explicitly.

use chime_core::Event;
use chime_storage::{Wal, WalEntry, WalError};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

/// WAL-backed event bus.
#[derive(Clone)]
pub struct EventBus {
    wal: Arc<Mutex<Wal>>,
    wake_tx: mpsc::Sender<()>,
}

/// Reader side of the bus, owned by the fire loop.
pub struct EventReader {
    wal: Arc<Mutex<Wal>>,
    wake_rx: mpsc::Receiver<()>,
}

impl EventBus {
    /// Create a bus backed by the given WAL.
    ///
    /// Returns both the bus (for sending) and the reader (for the loop).
    pub fn new(wal: Wal) -> (Self, EventReader) {
        let wal = Arc::new(Mutex::new(wal));
        let (wake_tx, wake_rx) = mpsc::channel(1);

        (
            Self {
                wal: Arc::clone(&wal),
                wake_tx,
            },
            EventReader { wal, wake_rx },
        )
    }

    /// Append an event (buffered, not yet durable).
    ///
    /// Returns the assigned sequence number.
    pub fn send(&self, event: Event) -> Result<u64, WalError> {
        let seq = self.wal.lock().append(&event)?;
        // Non-blocking wake - if the channel is full the loop is already awake
        let _ = self.wake_tx.try_send(());
        Ok(seq)
    }

    /// Append a batch of events, returning the last assigned sequence.
    pub fn send_all(&self, events: &[Event]) -> Result<u64, WalError> {
        let seq = {
            let mut wal = self.wal.lock();
            let mut last = wal.write_seq();
            for event in events {
                last = wal.append(event)?;
            }
            last
        };
        let _ = self.wake_tx.try_send(());
        Ok(seq)
    }

    /// Flush buffered events to disk with a single fsync.
    pub fn flush(&self) -> Result<(), WalError> {
        self.wal.lock().flush()
    }

    /// Check if the WAL wants flushing (interval elapsed or buffer full).
    pub fn needs_flush(&self) -> bool {
        self.wal.lock().needs_flush()
    }

    /// Last processed WAL sequence number.
    pub fn processed_seq(&self) -> u64 {
        self.wal.lock().processed_seq()
    }
}

impl EventReader {
    /// Wait for and return the next unprocessed event.
    ///
    /// Returns `None` when the bus is closed (all senders dropped).
    pub async fn recv(&mut self) -> Result<Option<WalEntry>, WalError> {
        loop {
            {
                let mut wal = self.wal.lock();
                if let Some(entry) = wal.next_unprocessed()? {
                    return Ok(Some(entry));
                }
            }

            if self.wake_rx.recv().await.is_none() {
                return Ok(None);
            }
        }
    }

    /// Mark an entry as processed. Persistence of the cursor happens via
    /// snapshots.
    pub fn mark_processed(&self, seq: u64) {
        self.wal.lock().mark_processed(seq);
    }

    /// Shared handle to the WAL, for the checkpoint task.
    pub fn wal(&self) -> Arc<Mutex<Wal>> {
        Arc::clone(&self.wal)
    }
}

#[cfg(test)]
#[path = "event_bus_tests.rs"]
mod tests;
