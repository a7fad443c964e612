// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, recovery.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use fs2::FileExt;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::net::UnixListener;
use tokio::sync::mpsc;
use tracing::{info, warn};

use chime_adapters::{NoOpInvoker, TracedInvoker};
use chime_core::{SystemClock, UuidIdGen};
use chime_engine::{FiringOutcome, Runtime, RuntimeConfig};
use chime_storage::{Snapshot, TimerTable, Wal};

use crate::event_bus::{EventBus, EventReader};

/// Daemon runtime with concrete adapter types (wrapped with tracing)
pub type DaemonRuntime = Runtime<TracedInvoker<NoOpInvoker>, SystemClock, UuidIdGen>;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/chime)
    pub state_dir: PathBuf,
    /// Path to Unix socket
    pub socket_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to version file
    pub version_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Path to WAL file
    pub wal_path: PathBuf,
    /// Path to snapshot file
    pub snapshot_path: PathBuf,
}

impl Config {
    /// Load configuration for the user-level daemon.
    ///
    /// Uses fixed paths under `~/.local/state/chime/` (or
    /// `$XDG_STATE_HOME/chime/`, or `$CHIME_STATE_DIR`).
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = crate::env::state_dir()?;

        Ok(Self {
            socket_path: state_dir.join("daemon.sock"),
            lock_path: state_dir.join("daemon.pid"),
            version_path: state_dir.join("daemon.version"),
            log_path: state_dir.join("daemon.log"),
            wal_path: state_dir.join("wal").join("events.wal"),
            snapshot_path: state_dir.join("snapshot.json"),
            state_dir,
        })
    }
}

/// Daemon state during operation.
///
/// The socket listener is returned separately from startup to be
/// spawned as a Listener task.
pub struct DaemonState {
    /// Configuration
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    /// Timer table (shared with the runtime and the checkpoint task)
    pub table: Arc<Mutex<TimerTable>>,
    /// Scheduling runtime
    pub runtime: Arc<DaemonRuntime>,
    /// Event bus for durable event delivery
    pub event_bus: EventBus,
    /// When daemon started
    pub start_time: Instant,
}

/// Result of daemon startup.
pub struct StartupResult {
    pub daemon: DaemonState,
    /// The Unix socket listener to spawn as a task
    pub listener: UnixListener,
    /// Event reader for the fire loop
    pub event_reader: EventReader,
    /// Firing completions for the fire loop
    pub outcome_rx: mpsc::Receiver<FiringOutcome>,
}

impl std::fmt::Debug for StartupResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StartupResult").finish_non_exhaustive()
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("WAL error: {0}")]
    Wal(#[from] chime_storage::WalError),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] chime_storage::SnapshotError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon
pub async fn startup(config: &Config) -> Result<StartupResult, LifecycleError> {
    match startup_inner(config).await {
        Ok(result) => Ok(result),
        Err(e) => {
            // Don't clean up if we failed to acquire the lock —
            // those files belong to the already-running daemon.
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

async fn startup_inner(config: &Config) -> Result<StartupResult, LifecycleError> {
    // 1. Create state directory (needed for socket, lock, etc.)
    std::fs::create_dir_all(&config.state_dir)?;

    // 2. Acquire lock file FIRST - prevents races.
    // Avoid truncating before we hold the lock, which would wipe the
    // running daemon's PID.
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    // Write PID to lock file (truncate now that we hold the lock)
    use std::io::Write;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file; // Drop mutability

    // 3. Write version file
    std::fs::write(&config.version_path, env!("CARGO_PKG_VERSION"))?;

    // 4. Load table from snapshot (if any) and replay the WAL tail
    let (mut table, processed_seq) = match Snapshot::load(&config.snapshot_path)? {
        Some(snapshot) => {
            info!(
                seq = snapshot.seq,
                timers = snapshot.table.len(),
                "loaded snapshot"
            );
            (snapshot.table, snapshot.seq)
        }
        None => {
            info!("no snapshot found, starting with empty table");
            (TimerTable::new(), 0)
        }
    };

    // Replay through the reader cursor so every replayed entry is marked
    // processed. The fire loop must never see these again: reapplying a
    // fired event would decrement loops twice, and a persisted shutdown
    // event would stop the daemon right after it started.
    let mut event_wal = Wal::open(&config.wal_path, processed_seq)?;
    let mut replay_count = 0usize;
    while let Some(entry) = event_wal.next_unprocessed()? {
        table.apply_event(&entry.event);
        event_wal.mark_processed(entry.seq);
        replay_count += 1;
    }
    if replay_count > 0 {
        info!(replay_count, after_seq = processed_seq, "replayed WAL tail");
    }
    info!(timers = table.len(), "recovered timer table");

    let (event_bus, event_reader) = EventBus::new(event_wal);

    // 5. Create the runtime over the recovered table and fill the window
    let table = Arc::new(Mutex::new(table));
    let (outcome_tx, outcome_rx) = mpsc::channel(256);
    let runtime = Arc::new(Runtime::new(
        TracedInvoker::new(NoOpInvoker::new()),
        SystemClock,
        UuidIdGen,
        RuntimeConfig::default(),
        Arc::clone(&table),
        outcome_tx,
    ));
    runtime.recover();

    // 6. Remove stale socket and bind (LAST - after all validation passes)
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    Ok(StartupResult {
        daemon: DaemonState {
            config: config.clone(),
            lock_file,
            table,
            runtime,
            event_bus,
            start_time: Instant::now(),
        },
        listener,
        event_reader,
        outcome_rx,
    })
}

impl DaemonState {
    /// Shutdown the daemon gracefully.
    ///
    /// Flushes the WAL and saves a final snapshot so the next startup
    /// does not need a long replay. Timers themselves are durable; any
    /// firing that was in flight simply refires after restart.
    pub fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("shutting down daemon...");

        if let Err(e) = self.event_bus.flush() {
            warn!("failed to flush WAL on shutdown: {}", e);
        }

        let processed_seq = self.event_bus.processed_seq();
        if processed_seq > 0 {
            let table_clone = self.table.lock().clone();
            let snapshot = Snapshot::new(
                processed_seq,
                table_clone,
                chime_core::Clock::epoch_ms(&SystemClock),
            );
            match snapshot.save(&self.config.snapshot_path) {
                Ok(()) => info!(seq = processed_seq, "saved final shutdown snapshot"),
                Err(e) => warn!("failed to save shutdown snapshot: {}", e),
            }
        }

        if self.config.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.socket_path) {
                warn!("failed to remove socket file: {}", e);
            }
        }
        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("failed to remove PID file: {}", e);
            }
        }
        if self.config.version_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.version_path) {
                warn!("failed to remove version file: {}", e);
            }
        }
        // Lock file is released automatically when self.lock_file drops

        info!("daemon shutdown complete");
        Ok(())
    }
}

/// Remove partially-created files after a failed startup.
fn cleanup_on_failure(config: &Config) {
    for path in [
        &config.socket_path,
        &config.lock_path,
        &config.version_path,
    ] {
        if path.exists() {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
