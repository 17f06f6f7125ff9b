// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The Remote Submission Interface consumed by the sync coordinator.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use kb_core::{LocalId, RemoteId, ReportPayload};

/// Three-way result of one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Stored remotely. Resubmitting the same local id yields the same remote id.
    Accepted(RemoteId),
    /// The payload or policy is at fault; retrying cannot help.
    RejectedPermanent(String),
    /// Timeouts, server errors, lost connections. Expected to succeed later.
    RejectedTransient(String),
}

impl SubmitOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmitOutcome::Accepted(_))
    }
}

/// A remote service that accepts report submissions.
///
/// Implementations must be idempotent on `local_id`: resubmitting an id the
/// service already accepted returns the original remote id instead of
/// creating a second report. Failures are classified into the outcome, so
/// this never returns an error.
pub trait RemoteSubmitter: Send + Sync {
    fn submit<'a>(
        &'a self,
        local_id: &'a LocalId,
        payload: &'a ReportPayload,
    ) -> Pin<Box<dyn Future<Output = SubmitOutcome> + Send + 'a>>;
}

impl<R: RemoteSubmitter + ?Sized> RemoteSubmitter for Arc<R> {
    fn submit<'a>(
        &'a self,
        local_id: &'a LocalId,
        payload: &'a ReportPayload,
    ) -> Pin<Box<dyn Future<Output = SubmitOutcome> + Send + 'a>> {
        (**self).submit(local_id, payload)
    }
}
