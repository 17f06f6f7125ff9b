// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// All possible errors that can occur in the kerb CLI.
///
/// Errors provide user-friendly messages with hints for common issues.
#[derive(Debug, Error)]
pub enum Error {
    #[error("not initialized: run 'kerb init' first")]
    NotInitialized,

    #[error("already initialized at {0}")]
    AlreadyInitialized(String),

    #[error("report not found: {0}\n  hint: run 'kerb list' to see local ids")]
    ReportNotFound(String),

    #[error("invalid local id: '{0}'")]
    InvalidLocalId(String),

    #[error("invalid device id: '{0}'\n  hint: use 1-32 lowercase letters and digits")]
    InvalidDevice(String),

    #[error("invalid remote URL '{0}': must be ws:// or wss://")]
    InvalidRemoteUrl(String),

    #[error("no remote configured\n  hint: add a [remote] section with a url to .kerb/config.toml")]
    NoRemote,

    #[error("invalid coordinates: {latitude}, {longitude}\n  hint: latitude is -90..90, longitude is -180..180")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    #[error("{field} cannot be empty")]
    FieldEmpty { field: &'static str },

    #[error("invalid state: '{0}'\n  hint: valid states are: pending, syncing, synced, failed")]
    InvalidState(String),

    #[error("cannot retry {id}: report is {state}\n  hint: only failed reports can be retried")]
    NotRetryable { id: String, state: String },

    #[error("report {id} cannot go from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: String,
        to: String,
    },

    #[error("no cached value for '{0}'")]
    CacheMiss(String),

    #[error("failed to generate unique local id after multiple retries")]
    IdGenerationFailed,

    #[error("another sync is running for this project\n  hint: stop 'kerb run' or wait for it to finish")]
    SyncLocked,

    #[error("sync stopped: {0}")]
    SyncStopped(String),

    #[error("invalid sync config: {0}")]
    InvalidSyncConfig(String),

    #[error("local store error: {0}")]
    Store(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("corrupted data in store: {0}")]
    CorruptedData(String),
}

/// A specialized Result type for kerb operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<kb_core::Error> for Error {
    fn from(e: kb_core::Error) -> Self {
        match e {
            kb_core::Error::NotFound(id) => Error::ReportNotFound(id),
            kb_core::Error::InvalidTransition { local_id, from, to } => Error::InvalidTransition {
                id: local_id,
                from,
                to,
            },
            kb_core::Error::InvalidLocalId(s) => Error::InvalidLocalId(s),
            kb_core::Error::InvalidState(s) => Error::InvalidState(s),
            kb_core::Error::Io(e) => Error::Io(e),
            kb_core::Error::Json(e) => Error::Json(e),
            kb_core::Error::CorruptedData(s) => Error::CorruptedData(s),
            e @ (kb_core::Error::DuplicateId(_)
            | kb_core::Error::Database(_)
            | kb_core::Error::LockPoisoned) => Error::Store(e.to_string()),
        }
    }
}

impl From<kb_sync::SyncError> for Error {
    fn from(e: kb_sync::SyncError) -> Self {
        match e {
            kb_sync::SyncError::Store(e) => e.into(),
            kb_sync::SyncError::Stopped => Error::SyncStopped("engine shut down".to_string()),
            kb_sync::SyncError::InvalidConfig(s) => Error::InvalidSyncConfig(s),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
