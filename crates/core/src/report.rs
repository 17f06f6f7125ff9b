// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Report types for the kerb sync engine.
//!
//! This module contains the fundamental data types: ReportRecord,
//! ReportPayload, SyncState and CacheEntry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::id::{LocalId, RemoteId};

/// WGS84 position of the reported issue.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Coordinates {
            latitude,
            longitude,
        }
    }

    /// Returns true if both components are finite and within WGS84 bounds.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// The user-authored content of a report.
///
/// Opaque to the sync engine beyond being serializable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportPayload {
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub category: String,
    pub coordinates: Coordinates,
    /// Reference to an image captured alongside the report (path or URI).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
}

impl ReportPayload {
    pub fn new(title: impl Into<String>, category: impl Into<String>, coordinates: Coordinates) -> Self {
        ReportPayload {
            title: title.into(),
            description: String::new(),
            category: category.into(),
            coordinates,
            image_ref: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_image(mut self, image_ref: impl Into<String>) -> Self {
        self.image_ref = Some(image_ref.into());
        self
    }
}

/// Details of the most recent failed submission of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    /// Failed attempts so far, including this one.
    pub attempts: u32,
    /// Last error reported by the remote or the transport.
    pub error: String,
    /// Set when the remote rejected the payload itself; never retried automatically.
    pub permanent: bool,
    pub failed_at: DateTime<Utc>,
    /// Earliest time an automatic retry may start. `None` when no automatic
    /// retry will happen (permanent or attempts exhausted).
    pub retry_at: Option<DateTime<Utc>>,
}

/// Sync state of a report record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncState {
    /// Stored locally, never submitted or requeued.
    Pending,
    /// A submission is in flight.
    Syncing,
    /// Accepted by the remote. Immutable.
    Synced { remote_id: RemoteId },
    /// Last submission failed.
    Failed(Failure),
}

impl SyncState {
    /// Returns the payload-free discriminant.
    pub fn kind(&self) -> SyncStateKind {
        match self {
            SyncState::Pending => SyncStateKind::Pending,
            SyncState::Syncing => SyncStateKind::Syncing,
            SyncState::Synced { .. } => SyncStateKind::Synced,
            SyncState::Failed(_) => SyncStateKind::Failed,
        }
    }

    /// Check if a transition from this state to `target` is valid.
    pub fn can_transition_to(&self, target: &SyncState) -> bool {
        self.kind().can_transition_to(target.kind())
    }
}

/// Discriminant of [`SyncState`], used for storage, queries and events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStateKind {
    Pending,
    Syncing,
    Synced,
    Failed,
}

impl SyncStateKind {
    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStateKind::Pending => "pending",
            SyncStateKind::Syncing => "syncing",
            SyncStateKind::Synced => "synced",
            SyncStateKind::Failed => "failed",
        }
    }

    /// Check if a transition from this state to `target` is valid.
    ///
    /// `Pending → Syncing → {Synced | Failed}`, `Failed → Syncing` for
    /// retries and `Failed → Pending` for a user requeue. Nothing leaves
    /// `Synced`. An in-flight `Syncing` record is only ever reset by
    /// [`Store::reset_stale_syncing`](crate::Store::reset_stale_syncing).
    pub fn can_transition_to(&self, target: SyncStateKind) -> bool {
        use SyncStateKind::*;
        matches!(
            (self, target),
            (Pending, Syncing)
                | (Syncing, Synced)
                | (Syncing, Failed)
                | (Failed, Syncing)
                | (Failed, Pending)
        )
    }

    /// Returns true if no transition can leave this state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncStateKind::Synced)
    }
}

impl fmt::Display for SyncStateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SyncStateKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(SyncStateKind::Pending),
            "syncing" => Ok(SyncStateKind::Syncing),
            "synced" => Ok(SyncStateKind::Synced),
            "failed" => Ok(SyncStateKind::Failed),
            _ => Err(Error::InvalidState(s.to_string())),
        }
    }
}

/// One civic-issue report authored on this device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub local_id: LocalId,
    pub payload: ReportPayload,
    pub state: SyncState,
    /// Failed submission attempts. Survives `Failed → Syncing` so retries
    /// keep counting; reset only by a user requeue.
    pub attempts: u32,
    /// Device-local creation time. Orders the outbox, nothing else.
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReportRecord {
    /// Creates a new `Pending` record.
    pub fn new(local_id: LocalId, payload: ReportPayload, created_at: DateTime<Utc>) -> Self {
        ReportRecord {
            local_id,
            payload,
            state: SyncState::Pending,
            attempts: 0,
            created_at,
            updated_at: created_at,
        }
    }

    /// The remote identifier, present once synced.
    pub fn remote_id(&self) -> Option<&RemoteId> {
        match &self.state {
            SyncState::Synced { remote_id } => Some(remote_id),
            _ => None,
        }
    }

    /// Failure details, present while failed.
    pub fn failure(&self) -> Option<&Failure> {
        match &self.state {
            SyncState::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

/// A cached key/value pair for auxiliary offline data. Last write wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    /// Serialized value, usually JSON.
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
