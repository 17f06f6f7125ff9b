// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The outbox: the sync-relevant view of the local store.
//!
//! Decides which records a run may attempt, applies the backoff schedule to
//! failures, and publishes a [`SyncEvent`] for every state change it makes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::stream::Stream;
use tokio::sync::broadcast;
use tracing::debug;

use kb_core::{
    ClockSource, Failure, LocalId, RemoteId, ReportPayload, ReportRecord, Result, Store,
    SyncState, SyncStateKind,
};

use crate::config::{Backoff, SyncConfig};
use crate::status::{broadcast_stream, StatusCounts, SyncEvent};

/// How a submission failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Retry with backoff until attempts run out.
    Transient,
    /// Dead letter: never retried automatically.
    Permanent,
}

pub struct Outbox {
    store: Arc<Store>,
    clock: Arc<dyn ClockSource>,
    backoff: Backoff,
    max_attempts: u32,
    events: broadcast::Sender<SyncEvent>,
}

impl Outbox {
    pub fn new(store: Arc<Store>, clock: Arc<dyn ClockSource>, config: &SyncConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_buffer.max(1));
        Outbox {
            store,
            clock,
            backoff: config.backoff(),
            max_attempts: config.max_attempts,
            events,
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Persist a new `Pending` record stamped with the current device time.
    pub fn enqueue(&self, local_id: LocalId, payload: ReportPayload) -> Result<ReportRecord> {
        let record = ReportRecord::new(local_id, payload, self.clock.now());
        self.store.insert(&record)?;
        debug!("Enqueued {}", record.local_id);
        Ok(record)
    }

    /// Records a run may attempt now, oldest first: all `Pending` records
    /// plus `Failed` ones that are transient, under the attempt limit and
    /// past their scheduled retry time.
    pub fn eligible_for_sync(&self) -> Result<Vec<ReportRecord>> {
        self.store.list_eligible(self.max_attempts, self.clock.now())
    }

    /// True when automatic retries are over for this record.
    pub fn is_exhausted(&self, record: &ReportRecord) -> bool {
        match &record.state {
            SyncState::Failed(failure) => {
                failure.permanent || record.attempts >= self.max_attempts
            }
            _ => false,
        }
    }

    /// `Failed` records that need user action, oldest first.
    pub fn exhausted(&self) -> Result<Vec<ReportRecord>> {
        Ok(self
            .store
            .list_by_state(SyncStateKind::Failed)?
            .into_iter()
            .filter(|record| self.is_exhausted(record))
            .collect())
    }

    pub fn mark_syncing(&self, local_id: &LocalId) -> Result<()> {
        self.transition(local_id, SyncState::Syncing)
    }

    pub fn mark_synced(&self, local_id: &LocalId, remote_id: RemoteId) -> Result<()> {
        self.transition(local_id, SyncState::Synced { remote_id })
    }

    /// Record a failed attempt, bumping the attempt counter.
    ///
    /// Transient failures under the attempt limit get a `retry_at` of
    /// `now + backoff(attempts)`; everything else gets none.
    pub fn mark_failed(
        &self,
        local_id: &LocalId,
        error: &str,
        kind: FailureKind,
    ) -> Result<Failure> {
        let record = self.store.get(local_id)?;
        let attempts = record.attempts.saturating_add(1);
        let now = self.clock.now();
        let permanent = kind == FailureKind::Permanent;

        let retry_at = if permanent || attempts >= self.max_attempts {
            None
        } else {
            let delay = self.backoff.delay_for(attempts);
            Some(
                chrono::Duration::from_std(delay)
                    .ok()
                    .and_then(|delay| now.checked_add_signed(delay))
                    .unwrap_or(DateTime::<Utc>::MAX_UTC),
            )
        };

        let failure = Failure {
            attempts,
            error: error.to_string(),
            permanent,
            failed_at: now,
            retry_at,
        };
        self.transition(local_id, SyncState::Failed(failure.clone()))?;
        Ok(failure)
    }

    /// Move a `Failed` record back to `Pending` with a fresh attempt budget.
    pub fn requeue(&self, local_id: &LocalId) -> Result<()> {
        self.transition(local_id, SyncState::Pending)
    }

    /// Reset records stranded in `Syncing` by a dead process.
    pub fn recover_stale(&self) -> Result<Vec<LocalId>> {
        let ids = self.store.reset_stale_syncing()?;
        for local_id in &ids {
            debug!("Recovered stale submission {}", local_id);
            let _ = self.events.send(SyncEvent {
                local_id: local_id.clone(),
                from: SyncStateKind::Syncing,
                to: SyncStateKind::Pending,
            });
        }
        Ok(ids)
    }

    pub fn counts(&self) -> Result<StatusCounts> {
        let failed = self.store.failed_counts(self.max_attempts)?;
        Ok(StatusCounts {
            pending: self.store.count_by_state(SyncStateKind::Pending)?,
            syncing: self.store.count_by_state(SyncStateKind::Syncing)?,
            synced: self.store.count_by_state(SyncStateKind::Synced)?,
            retrying: failed.retrying,
            exhausted: failed.exhausted,
        })
    }

    /// `Pending` plus `Syncing` records.
    pub fn pending_count(&self) -> Result<usize> {
        Ok(self.store.count_by_state(SyncStateKind::Pending)?
            + self.store.count_by_state(SyncStateKind::Syncing)?)
    }

    /// Failures that will be retried automatically.
    pub fn failed_count(&self) -> Result<usize> {
        Ok(self.store.failed_counts(self.max_attempts)?.retrying)
    }

    /// Failures that need user action.
    pub fn exhausted_count(&self) -> Result<usize> {
        Ok(self.store.failed_counts(self.max_attempts)?.exhausted)
    }

    /// Earliest scheduled automatic retry, if any.
    pub fn next_retry_at(&self) -> Result<Option<DateTime<Utc>>> {
        self.store.next_retry_at(self.max_attempts)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// A fresh stream of state changes from now on.
    pub fn events(&self) -> impl Stream<Item = SyncEvent> + Send + Unpin {
        broadcast_stream(self.events.subscribe())
    }

    fn transition(&self, local_id: &LocalId, state: SyncState) -> Result<()> {
        let to = state.kind();
        let from = self.store.update_state(local_id, &state)?;
        debug!("{}: {} -> {}", local_id, from, to);
        let _ = self.events.send(SyncEvent {
            local_id: local_id.clone(),
            from,
            to,
        });
        Ok(())
    }
}

#[cfg(test)]
#[path = "outbox_tests.rs"]
mod tests;
