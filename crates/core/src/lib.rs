// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! kb-core: Shared library for the kerb report sync engine
//!
//! This crate provides the report data model, the durable local store, local
//! id generation and the wire protocol used by both the kerb client and the
//! kb-remote submission server.

pub mod clock;
pub mod error;
pub mod id;
pub mod protocol;
pub mod report;
pub mod store;

pub use clock::{ClockSource, SystemClock};
pub use error::{Error, Result};
pub use id::{validate_device, LocalId, LocalIdGenerator, RemoteId};
pub use protocol::{ClientMessage, ServerMessage};
pub use report::{
    CacheEntry, Coordinates, Failure, ReportPayload, ReportRecord, SyncState, SyncStateKind,
};
pub use store::{FailedCounts, Store};
