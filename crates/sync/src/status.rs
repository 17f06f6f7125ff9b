// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Status interface exposed to the UI: counts and live sync events.

use futures_util::stream::{self, Stream};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use kb_core::{LocalId, SyncStateKind};

/// One record changed sync state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncEvent {
    pub local_id: LocalId,
    pub from: SyncStateKind,
    pub to: SyncStateKind,
}

/// Record counts by user-visible bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub syncing: usize,
    pub synced: usize,
    /// Transient failures that will be retried automatically.
    pub retrying: usize,
    /// Permanent rejections and records out of attempts. Need user action.
    pub exhausted: usize,
}

impl StatusCounts {
    /// Records not yet delivered and not failed: `Pending` plus `Syncing`.
    pub fn pending_count(&self) -> usize {
        self.pending + self.syncing
    }

    /// "Will retry automatically".
    pub fn failed_count(&self) -> usize {
        self.retrying
    }

    /// "Needs your attention".
    pub fn exhausted_count(&self) -> usize {
        self.exhausted
    }

    pub fn total(&self) -> usize {
        self.pending + self.syncing + self.synced + self.retrying + self.exhausted
    }
}

/// Adapt a broadcast receiver into a stream that ends when the sender is gone.
///
/// A lagging consumer skips the events it missed instead of slowing the sender.
pub fn broadcast_stream<T>(rx: broadcast::Receiver<T>) -> impl Stream<Item = T> + Send + Unpin
where
    T: Clone + Send + 'static,
{
    Box::pin(stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(item) => return Some((item, rx)),
                Err(RecvError::Lagged(n)) => {
                    warn!("Event subscriber lagged by {} events", n);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }))
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
