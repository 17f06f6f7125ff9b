// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite-backed durable store for report records and cache entries.
//!
//! [`Store`] serializes all access through a single connection guarded by a
//! mutex. Every state change runs inside an immediate transaction, so a crash
//! leaves a record either in its old state or its new one.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::id::{LocalId, RemoteId};
use crate::report::{CacheEntry, Failure, ReportPayload, ReportRecord, SyncState, SyncStateKind};

/// SQL schema for the report store.
pub const SCHEMA: &str = r#"
-- One row per report authored on this device
CREATE TABLE IF NOT EXISTS reports (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    local_id TEXT NOT NULL UNIQUE,
    remote_id TEXT,
    payload TEXT NOT NULL,
    state TEXT NOT NULL DEFAULT 'pending',
    attempts INTEGER NOT NULL DEFAULT 0,
    last_error TEXT,
    permanent INTEGER NOT NULL DEFAULT 0,
    failed_at TEXT,
    retry_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    CHECK (state IN ('pending', 'syncing', 'synced', 'failed')),
    CHECK ((state = 'synced') = (remote_id IS NOT NULL))
);

-- Synced rows never change
CREATE TRIGGER IF NOT EXISTS reports_synced_immutable
BEFORE UPDATE ON reports
WHEN OLD.state = 'synced'
BEGIN
    SELECT RAISE(ABORT, 'synced reports are immutable');
END;

-- Auxiliary offline data, last write wins
CREATE TABLE IF NOT EXISTS cache (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_reports_state ON reports(state, created_at);
"#;

const REPORT_COLUMNS: &str = "local_id, remote_id, payload, state, attempts, last_error, \
     permanent, failed_at, retry_at, created_at, updated_at";

/// Format a timestamp for storage. Fixed precision keeps text ordering
/// identical to chronological ordering.
fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn corrupted(message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(Error::CorruptedData(message)),
    )
}

/// Parse a string value from the database, returning a rusqlite error on parse failure.
fn parse_db<T: std::str::FromStr>(
    value: &str,
    column: &str,
) -> std::result::Result<T, rusqlite::Error> {
    value
        .parse()
        .map_err(|_| corrupted(format!("invalid value '{value}' in column '{column}'")))
}

/// Parse an RFC3339 timestamp from the database.
fn parse_timestamp(
    value: &str,
    column: &str,
) -> std::result::Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| corrupted(format!("invalid timestamp '{value}' in column '{column}'")))
}

fn parse_timestamp_opt(
    value: Option<String>,
    column: &str,
) -> std::result::Result<Option<DateTime<Utc>>, rusqlite::Error> {
    value.map(|v| parse_timestamp(&v, column)).transpose()
}

fn row_to_record(row: &Row<'_>) -> std::result::Result<ReportRecord, rusqlite::Error> {
    let local_id_str: String = row.get(0)?;
    let remote_id: Option<String> = row.get(1)?;
    let payload_str: String = row.get(2)?;
    let state_str: String = row.get(3)?;
    let attempts: u32 = row.get(4)?;
    let last_error: Option<String> = row.get(5)?;
    let permanent: bool = row.get(6)?;
    let failed_at: Option<String> = row.get(7)?;
    let retry_at: Option<String> = row.get(8)?;
    let created_str: String = row.get(9)?;
    let updated_str: String = row.get(10)?;

    let local_id: LocalId = parse_db(&local_id_str, "local_id")?;
    let payload: ReportPayload = serde_json::from_str(&payload_str)
        .map_err(|e| corrupted(format!("invalid payload for {local_id}: {e}")))?;

    let state = match parse_db::<SyncStateKind>(&state_str, "state")? {
        SyncStateKind::Pending => SyncState::Pending,
        SyncStateKind::Syncing => SyncState::Syncing,
        SyncStateKind::Synced => {
            let remote_id = remote_id
                .ok_or_else(|| corrupted(format!("synced report {local_id} has no remote id")))?;
            SyncState::Synced {
                remote_id: RemoteId::new(remote_id),
            }
        }
        SyncStateKind::Failed => {
            let failed_at = parse_timestamp_opt(failed_at, "failed_at")?
                .ok_or_else(|| corrupted(format!("failed report {local_id} has no failed_at")))?;
            SyncState::Failed(Failure {
                attempts,
                error: last_error.unwrap_or_default(),
                permanent,
                failed_at,
                retry_at: parse_timestamp_opt(retry_at, "retry_at")?,
            })
        }
    };

    Ok(ReportRecord {
        local_id,
        payload,
        state,
        attempts,
        created_at: parse_timestamp(&created_str, "created_at")?,
        updated_at: parse_timestamp(&updated_str, "updated_at")?,
    })
}

/// Run schema creation on a database connection.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Failed-record counts split by whether automatic retry will happen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailedCounts {
    /// Transient failures still under the attempt limit.
    pub retrying: usize,
    /// Permanent rejections plus records that ran out of attempts.
    pub exhausted: usize,
}

/// Durable store for reports and cache entries.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open a store at the given path, creating and migrating if needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = FULL;
             PRAGMA busy_timeout = 5000;",
        )?;
        run_migrations(&conn)?;
        Ok(Store {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;
        Ok(Store {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| Error::LockPoisoned)
    }

    /// Append a new record. It is always stored as `Pending` with zero attempts.
    ///
    /// Fails with [`Error::DuplicateId`] if the local id is already present.
    pub fn insert(&self, record: &ReportRecord) -> Result<()> {
        let payload = serde_json::to_string(&record.payload)?;
        let created_at = format_timestamp(&record.created_at);
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO reports (local_id, payload, state, attempts, created_at, updated_at)
             VALUES (?1, ?2, 'pending', 0, ?3, ?3)",
            params![record.local_id.as_str(), payload, created_at],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(ref err, _)
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Error::DuplicateId(record.local_id.to_string())
            }
            other => Error::Database(other),
        })?;
        Ok(())
    }

    /// Get a record by local id.
    pub fn get(&self, local_id: &LocalId) -> Result<ReportRecord> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                &format!("SELECT {REPORT_COLUMNS} FROM reports WHERE local_id = ?1"),
                params![local_id.as_str()],
                row_to_record,
            )
            .optional()?;

        record.ok_or_else(|| Error::NotFound(local_id.to_string()))
    }

    /// Atomically move a record to `state`, returning the state it left.
    ///
    /// The attempt counter follows the new state: a `Failed` state writes its
    /// own count, `Failed → Pending` resets it, anything else keeps it.
    pub fn update_state(&self, local_id: &LocalId, state: &SyncState) -> Result<SyncStateKind> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current: Option<String> = tx
            .query_row(
                "SELECT state FROM reports WHERE local_id = ?1",
                params![local_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        let current = current.ok_or_else(|| Error::NotFound(local_id.to_string()))?;
        let from: SyncStateKind = current.parse()?;
        let to = state.kind();

        if !from.can_transition_to(to) {
            return Err(Error::InvalidTransition {
                local_id: local_id.to_string(),
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        let now = format_timestamp(&Utc::now());
        match state {
            SyncState::Pending if from == SyncStateKind::Failed => {
                tx.execute(
                    "UPDATE reports SET state = 'pending', attempts = 0, last_error = NULL,
                     permanent = 0, failed_at = NULL, retry_at = NULL, updated_at = ?1
                     WHERE local_id = ?2",
                    params![now, local_id.as_str()],
                )?;
            }
            SyncState::Pending | SyncState::Syncing => {
                tx.execute(
                    "UPDATE reports SET state = ?1, updated_at = ?2 WHERE local_id = ?3",
                    params![to.as_str(), now, local_id.as_str()],
                )?;
            }
            SyncState::Synced { remote_id } => {
                tx.execute(
                    "UPDATE reports SET state = 'synced', remote_id = ?1, last_error = NULL,
                     permanent = 0, retry_at = NULL, updated_at = ?2
                     WHERE local_id = ?3",
                    params![remote_id.as_str(), now, local_id.as_str()],
                )?;
            }
            SyncState::Failed(failure) => {
                tx.execute(
                    "UPDATE reports SET state = 'failed', attempts = ?1, last_error = ?2,
                     permanent = ?3, failed_at = ?4, retry_at = ?5, updated_at = ?6
                     WHERE local_id = ?7",
                    params![
                        failure.attempts,
                        failure.error,
                        failure.permanent,
                        format_timestamp(&failure.failed_at),
                        failure.retry_at.as_ref().map(format_timestamp),
                        now,
                        local_id.as_str(),
                    ],
                )?;
            }
        }

        tx.commit()?;
        Ok(from)
    }

    /// Snapshot of records in `state`, oldest first.
    pub fn list_by_state(&self, state: SyncStateKind) -> Result<Vec<ReportRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports WHERE state = ?1 ORDER BY created_at, seq"
        ))?;
        let records = stmt
            .query_map(params![state.as_str()], row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Snapshot of all records, oldest first.
    pub fn list_all(&self) -> Result<Vec<ReportRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports ORDER BY created_at, seq"
        ))?;
        let records = stmt
            .query_map([], row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Snapshot of records a sync run may attempt at `now`, oldest first.
    ///
    /// Includes every `Pending` record and each `Failed` record that is
    /// transient, under `max_attempts`, and past its retry time.
    pub fn list_eligible(&self, max_attempts: u32, now: DateTime<Utc>) -> Result<Vec<ReportRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports
             WHERE state = 'pending'
                OR (state = 'failed' AND permanent = 0 AND attempts < ?1
                    AND (retry_at IS NULL OR retry_at <= ?2))
             ORDER BY created_at, seq"
        ))?;
        let records = stmt
            .query_map(params![max_attempts, format_timestamp(&now)], row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Reset every `Syncing` record back to `Pending`, returning the ids touched.
    ///
    /// A `Syncing` row can only survive a process that died mid-submission.
    pub fn reset_stale_syncing(&self) -> Result<Vec<LocalId>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let ids = {
            let mut stmt = tx.prepare(
                "SELECT local_id FROM reports WHERE state = 'syncing' ORDER BY created_at, seq",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    let id: String = row.get(0)?;
                    parse_db::<LocalId>(&id, "local_id")
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        };

        if !ids.is_empty() {
            tx.execute(
                "UPDATE reports SET state = 'pending', updated_at = ?1 WHERE state = 'syncing'",
                params![format_timestamp(&Utc::now())],
            )?;
        }
        tx.commit()?;
        Ok(ids)
    }

    /// Number of records in `state`.
    pub fn count_by_state(&self, state: SyncStateKind) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM reports WHERE state = ?1",
            params![state.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Split `Failed` records into retrying and exhausted.
    pub fn failed_counts(&self, max_attempts: u32) -> Result<FailedCounts> {
        let conn = self.conn()?;
        let (exhausted, retrying): (i64, i64) = conn.query_row(
            "SELECT
                 COALESCE(SUM(CASE WHEN permanent = 1 OR attempts >= ?1 THEN 1 ELSE 0 END), 0),
                 COALESCE(SUM(CASE WHEN permanent = 0 AND attempts < ?1 THEN 1 ELSE 0 END), 0)
             FROM reports WHERE state = 'failed'",
            params![max_attempts],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(FailedCounts {
            retrying: retrying as usize,
            exhausted: exhausted as usize,
        })
    }

    /// Earliest scheduled retry among records that will be retried automatically.
    pub fn next_retry_at(&self, max_attempts: u32) -> Result<Option<DateTime<Utc>>> {
        let conn = self.conn()?;
        let next: Option<String> = conn.query_row(
            "SELECT MIN(retry_at) FROM reports
             WHERE state = 'failed' AND permanent = 0 AND attempts < ?1 AND retry_at IS NOT NULL",
            params![max_attempts],
            |row| row.get(0),
        )?;
        Ok(parse_timestamp_opt(next, "retry_at")?)
    }

    /// Insert or overwrite a cache entry.
    pub fn put(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO cache (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, format_timestamp(&Utc::now())],
        )?;
        Ok(())
    }

    /// Get a cache entry, if present.
    pub fn get_cache(&self, key: &str) -> Result<Option<CacheEntry>> {
        let conn = self.conn()?;
        let entry = conn
            .query_row(
                "SELECT key, value, updated_at FROM cache WHERE key = ?1",
                params![key],
                |row| {
                    let updated_str: String = row.get(2)?;
                    Ok(CacheEntry {
                        key: row.get(0)?,
                        value: row.get(1)?,
                        updated_at: parse_timestamp(&updated_str, "updated_at")?,
                    })
                },
            )
            .optional()?;
        Ok(entry)
    }

    /// Serialize `value` as JSON and cache it under `key`.
    pub fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.put(key, &json)
    }

    /// Read a JSON cache entry back into `T`.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_cache(key)? {
            Some(entry) => Ok(Some(serde_json::from_str(&entry.value)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
