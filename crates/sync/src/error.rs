// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the sync engine.
//!
//! Per-record submission failures are not errors here: they are recorded as
//! `Failed` state on the record. Only conditions that stop a run or the
//! engine surface as [`SyncError`].

use thiserror::Error;

/// Errors that stop a sync run or the engine itself.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The local store failed. Fatal to the run; record states are left as they were.
    #[error("local store failure: {0}")]
    Store(#[from] kb_core::Error),

    #[error("sync engine stopped")]
    Stopped,

    #[error("invalid sync config: {0}")]
    InvalidConfig(String),
}

impl SyncError {
    /// True when the underlying cause is a local persistence failure.
    pub fn is_storage(&self) -> bool {
        matches!(self, SyncError::Store(e) if e.is_storage())
    }
}

/// A specialized Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
