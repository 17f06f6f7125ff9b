// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for kb-core operations.

use thiserror::Error;

/// All possible errors that can occur in kb-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("report not found: {0}")]
    NotFound(String),

    #[error("invalid sync transition for {local_id}: cannot go from {from} to {to}")]
    InvalidTransition {
        local_id: String,
        from: String,
        to: String,
    },

    #[error("report already exists: {0}\n  hint: local ids must be freshly generated")]
    DuplicateId(String),

    #[error("invalid local id: '{0}'")]
    InvalidLocalId(String),

    #[error("invalid sync state: '{0}'\n  hint: valid states are: pending, syncing, synced, failed")]
    InvalidState(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupted data: {0}")]
    CorruptedData(String),

    #[error("store lock poisoned")]
    LockPoisoned,
}

impl Error {
    /// True for local persistence failures.
    ///
    /// These are fatal to a sync run and leave record states unchanged.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Error::DuplicateId(_)
                | Error::Database(_)
                | Error::Io(_)
                | Error::Json(_)
                | Error::CorruptedData(_)
                | Error::LockPoisoned
        )
    }

    /// True for caller bugs: unknown ids and forbidden state transitions.
    ///
    /// These fail the single operation, never a whole run.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::InvalidTransition { .. })
    }
}

/// A specialized Result type for kb-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
