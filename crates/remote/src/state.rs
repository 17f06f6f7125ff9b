// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Server state management.
//!
//! Wraps the submissions database for shared access across connections.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, error, info, warn};

use kb_core::protocol::ServerMessage;
use kb_core::{Error, LocalId, RemoteId, ReportPayload, Result};

/// SQL schema for accepted submissions.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS submissions (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    local_id TEXT NOT NULL UNIQUE,
    remote_id TEXT UNIQUE,
    payload TEXT NOT NULL,
    received_at TEXT NOT NULL
);
"#;

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_CATEGORY_LEN: usize = 64;
pub const MAX_DESCRIPTION_LEN: usize = 5000;
pub const MAX_IMAGE_REF_LEN: usize = 2048;

/// Shared server state containing the submissions database.
#[derive(Clone)]
pub struct ServerState {
    inner: Arc<ServerStateInner>,
}

struct ServerStateInner {
    db: Mutex<Connection>,
    /// Submissions left to fail transiently before storage is attempted.
    injected_failures: AtomicUsize,
}

impl ServerStateInner {
    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.db.lock().map_err(|_| Error::LockPoisoned)
    }

    fn take_injected_failure(&self) -> bool {
        self.injected_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    /// Answer for one submission. Runs on a blocking thread.
    fn accept(&self, local_id: LocalId, payload: &ReportPayload) -> Result<ServerMessage> {
        let db = self.conn()?;

        let existing: Option<String> = db
            .query_row(
                "SELECT remote_id FROM submissions WHERE local_id = ?1",
                params![local_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(remote_id) = existing {
            debug!("Duplicate submission {} -> {}", local_id, remote_id);
            return Ok(ServerMessage::accepted(local_id, RemoteId::new(remote_id)));
        }

        if let Err(reason) = validate(payload) {
            info!("Rejecting {}: {}", local_id, reason);
            return Ok(ServerMessage::rejected_permanent(local_id, reason));
        }

        if self.take_injected_failure() {
            warn!("Injected failure for {}", local_id);
            return Ok(ServerMessage::rejected_transient(local_id, "service unavailable"));
        }

        let tx = db.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO submissions (local_id, payload, received_at) VALUES (?1, ?2, ?3)",
            params![
                local_id.as_str(),
                serde_json::to_string(payload)?,
                Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            ],
        )?;
        let seq = tx.last_insert_rowid();
        let remote_id = format!("rpt-{:06}", seq);
        tx.execute(
            "UPDATE submissions SET remote_id = ?1 WHERE seq = ?2",
            params![remote_id, seq],
        )?;
        tx.commit()?;

        info!("Accepted {} as {}", local_id, remote_id);
        Ok(ServerMessage::accepted(local_id, RemoteId::new(remote_id)))
    }
}

impl ServerState {
    /// Opens (or creates) `submissions.db` in the given directory.
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let conn = Connection::open(data_dir.join("submissions.db"))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "FULL")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(ServerState {
            inner: Arc::new(ServerStateInner {
                db: Mutex::new(conn),
                injected_failures: AtomicUsize::new(0),
            }),
        })
    }

    /// Run `f` against the database on the blocking pool.
    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&ServerStateInner) -> Result<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || f(&inner))
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e)))?
    }

    /// Handles a submission and returns the answer for the client.
    ///
    /// An already accepted local id gets its original remote id back,
    /// whatever payload comes with it. Only new ids are validated.
    pub async fn accept(&self, local_id: LocalId, payload: &ReportPayload) -> ServerMessage {
        let payload = payload.clone();
        let id = local_id.clone();
        match self.blocking(move |inner| inner.accept(id, &payload)).await {
            Ok(answer) => answer,
            Err(e) => {
                error!("Failed to store {}: {}", local_id, e);
                ServerMessage::rejected_transient(local_id, format!("storage failure: {}", e))
            }
        }
    }

    /// Number of accepted submissions.
    pub async fn submission_count(&self) -> Result<usize> {
        self.blocking(|inner| {
            let count: i64 =
                inner
                    .conn()?
                    .query_row("SELECT COUNT(*) FROM submissions", [], |row| row.get(0))?;
            Ok(count as usize)
        })
        .await
    }

    /// Remote id assigned to a local id, if accepted.
    #[cfg(test)]
    pub async fn remote_id_for(&self, local_id: &LocalId) -> Result<Option<RemoteId>> {
        let local_id = local_id.clone();
        self.blocking(move |inner| {
            let remote_id: Option<String> = inner
                .conn()?
                .query_row(
                    "SELECT remote_id FROM submissions WHERE local_id = ?1",
                    params![local_id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(remote_id.map(RemoteId::new))
        })
        .await
    }

    /// Make the next `n` new valid submissions fail transiently.
    #[cfg(test)]
    pub fn inject_transient_failures(&self, n: usize) {
        self.inner.injected_failures.store(n, Ordering::SeqCst);
    }

    /// Break the database so every store attempt errors.
    #[cfg(test)]
    pub async fn break_storage(&self) {
        let _ = self
            .blocking(|inner| {
                inner.conn()?.execute_batch("DROP TABLE submissions")?;
                Ok(())
            })
            .await;
    }
}

/// Checks a payload against what the service will ever store.
fn validate(payload: &ReportPayload) -> std::result::Result<(), String> {
    if payload.title.trim().is_empty() {
        return Err("title must not be empty".to_string());
    }
    if payload.title.chars().count() > MAX_TITLE_LEN {
        return Err(format!("title exceeds {} characters", MAX_TITLE_LEN));
    }
    if payload.category.trim().is_empty() {
        return Err("category must not be empty".to_string());
    }
    if payload.category.chars().count() > MAX_CATEGORY_LEN {
        return Err(format!("category exceeds {} characters", MAX_CATEGORY_LEN));
    }
    if payload.description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(format!(
            "description exceeds {} characters",
            MAX_DESCRIPTION_LEN
        ));
    }
    if let Some(image) = &payload.image_ref {
        if image.len() > MAX_IMAGE_REF_LEN {
            return Err(format!("image reference exceeds {} bytes", MAX_IMAGE_REF_LEN));
        }
    }
    if !payload.coordinates.is_valid() {
        return Err(format!(
            "coordinates out of range: {}, {}",
            payload.coordinates.latitude, payload.coordinates.longitude
        ));
    }
    Ok(())
}
