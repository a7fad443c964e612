// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Point-in-time snapshots of the timer table.
//!
//! A snapshot records the table plus the WAL sequence it reflects, so
//! recovery is snapshot load + replay of entries after `seq`. Saves are
//! atomic (tmp file + rename); a corrupt snapshot on load is set aside
//! and recovery falls back to full WAL replay.

use crate::table::TimerTable;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A snapshot of the timer table at a WAL sequence number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// WAL sequence this snapshot reflects; replay resumes after it
    pub seq: u64,
    pub table: TimerTable,
    /// Wall-clock time the snapshot was taken, epoch milliseconds
    pub created_at_ms: u64,
}

impl Snapshot {
    pub fn new(seq: u64, table: TimerTable, created_at_ms: u64) -> Self {
        Self {
            seq,
            table,
            created_at_ms,
        }
    }

    /// Write the snapshot atomically: serialize to a tmp file next to
    /// the target, fsync, then rename over it.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp_path = path.with_extension("tmp");
        let json = serde_json::to_vec(self)?;
        std::fs::write(&tmp_path, &json)?;

        let tmp = std::fs::File::open(&tmp_path)?;
        tmp.sync_all()?;
        drop(tmp);

        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Load a snapshot, or `None` if the file does not exist.
    ///
    /// A snapshot that exists but fails to parse is moved aside to
    /// `<path>.bak` so the caller can fall back to full WAL replay
    /// without tripping over it again next start.
    pub fn load(path: &Path) -> Result<Option<Self>, SnapshotError> {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice(&bytes) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                let bak = path.with_extension("bak");
                warn!(
                    path = %path.display(),
                    error = %e,
                    "corrupt snapshot, moving aside and replaying full log",
                );
                std::fs::rename(path, &bak)?;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
