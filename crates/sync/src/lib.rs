// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Offline-first synchronization for locally captured reports.
//!
//! Reports are persisted to the local store first and submitted to the
//! remote service when the device is online. The pieces:
//!
//! - [`ConnectivityMonitor`] debounces a raw reachability signal
//! - [`Outbox`] owns per-record sync state and retry scheduling
//! - [`SyncCoordinator`] drains the outbox with bounded concurrency
//! - [`RemoteSubmitter`] is the seam to the remote service; [`WsRemote`] speaks
//!   the WebSocket protocol
//! - [`SyncEngine`] wires them together

pub mod config;
pub mod connectivity;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod outbox;
pub mod probe;
pub mod remote;
pub mod status;
pub mod transport;
pub mod ws_remote;

#[cfg(test)]
mod testing;

pub use config::{Backoff, SyncConfig};
pub use connectivity::{ConnectivityEvent, ConnectivityKind, ConnectivityMonitor};
pub use coordinator::{
    AbortReason, EngineHealth, RunOutcome, RunReport, SyncCoordinator, Trigger, TriggerOutcome,
};
pub use engine::SyncEngine;
pub use error::{Result, SyncError};
pub use outbox::{FailureKind, Outbox};
pub use probe::{poll_reachability, ReachabilityProbe, TcpProbe};
pub use remote::{RemoteSubmitter, SubmitOutcome};
pub use status::{broadcast_stream, StatusCounts, SyncEvent};
pub use transport::{Transport, TransportError, TransportResult, WebSocketTransport};
pub use ws_remote::{TransportFactory, WsRemote};
