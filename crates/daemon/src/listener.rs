// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for handling socket I/O.
//!
//! The Listener runs in a spawned task, accepting connections and
//! handling them without blocking the fire loop. Commands are validated
//! against current state, appended to the EventBus, and flushed to disk
//! before the reply goes out, so an acknowledged command survives a
//! crash.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, error, warn};

use chime_core::{Event, Origin};

use crate::event_bus::EventBus;
use crate::lifecycle::DaemonRuntime;
use crate::protocol::{
    self, Request, Response, StatusInfo, DEFAULT_TIMEOUT, PROTOCOL_VERSION,
};

/// Listener task for accepting socket connections.
pub struct Listener {
    socket: UnixListener,
    event_bus: EventBus,
    runtime: Arc<DaemonRuntime>,
    start_time: Instant,
}

/// Errors from connection handling.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),

    #[error("WAL error")]
    WalError,
}

impl Listener {
    pub fn new(
        socket: UnixListener,
        event_bus: EventBus,
        runtime: Arc<DaemonRuntime>,
        start_time: Instant,
    ) -> Self {
        Self {
            socket,
            event_bus,
            runtime,
            start_time,
        }
    }

    /// Run the listener loop, spawning a task per connection.
    pub async fn run(self) {
        loop {
            match self.socket.accept().await {
                Ok((stream, _)) => {
                    let event_bus = self.event_bus.clone();
                    let runtime = Arc::clone(&self.runtime);
                    let start_time = self.start_time;

                    tokio::spawn(async move {
                        if let Err(e) =
                            handle_connection(stream, event_bus, runtime, start_time).await
                        {
                            match e {
                                ConnectionError::Protocol(
                                    protocol::ProtocolError::ConnectionClosed,
                                ) => debug!("client disconnected"),
                                ConnectionError::Protocol(protocol::ProtocolError::Timeout) => {
                                    warn!("connection timeout")
                                }
                                _ => error!("connection error: {}", e),
                            }
                        }
                    });
                }
                Err(e) => {
                    error!("accept error: {}", e);
                }
            }
        }
    }
}

/// Handle a single client connection.
async fn handle_connection(
    stream: UnixStream,
    event_bus: EventBus,
    runtime: Arc<DaemonRuntime>,
    start_time: Instant,
) -> Result<(), ConnectionError> {
    let (mut reader, mut writer) = stream.into_split();

    let request = protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await?;
    debug!(request = ?request, "received request");

    let response = handle_request(request, &event_bus, &runtime, start_time)?;
    debug!(response = ?response, "sending response");

    protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT).await?;
    Ok(())
}

/// Handle a single request and return a response.
fn handle_request(
    request: Request,
    event_bus: &EventBus,
    runtime: &DaemonRuntime,
    start_time: Instant,
) -> Result<Response, ConnectionError> {
    match request {
        Request::Ping => Ok(Response::Pong),

        Request::Hello { version: _ } => Ok(Response::Hello {
            version: PROTOCOL_VERSION.to_string(),
        }),

        Request::Create { timer } => match runtime.handle_create(timer) {
            Ok((record, events)) => {
                event_bus
                    .send_all(&events)
                    .map_err(|_| ConnectionError::WalError)?;
                // Durability point: the ack promises the timer survives a crash
                event_bus.flush().map_err(|_| ConnectionError::WalError)?;
                Ok(Response::Created { id: record.id })
            }
            Err(e) => Ok(Response::Error {
                message: e.to_string(),
            }),
        },

        Request::Cancel { id } => match runtime.handle_cancel(&id, Origin::default()) {
            Ok(events) => {
                event_bus
                    .send_all(&events)
                    .map_err(|_| ConnectionError::WalError)?;
                event_bus.flush().map_err(|_| ConnectionError::WalError)?;
                Ok(Response::Canceled { id })
            }
            Err(e) => Ok(Response::Error {
                message: e.to_string(),
            }),
        },

        Request::Status => {
            let status = runtime.status();
            Ok(Response::Status(StatusInfo {
                version: PROTOCOL_VERSION.to_string(),
                pid: std::process::id(),
                uptime_ms: start_time.elapsed().as_millis() as u64,
                timers: status.timers,
                window: status.window,
                horizon_ms: status.horizon_ms,
                next_due_ms: status.next_due_ms,
            }))
        }

        Request::Shutdown => {
            // Durable like any other command: the fire loop stops when it
            // reaches this entry, after everything appended before it.
            event_bus
                .send(Event::Shutdown)
                .map_err(|_| ConnectionError::WalError)?;
            event_bus.flush().map_err(|_| ConnectionError::WalError)?;
            Ok(Response::ShuttingDown)
        }
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
