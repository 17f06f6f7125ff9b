// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use chrono::Utc;
use kb_core::{Coordinates, ReportPayload, ReportRecord, Store, SyncState, SystemClock};
use kb_sync::{FailureKind, SyncConfig};
use std::sync::Arc;

fn outbox_with(raw: &str) -> (Outbox, LocalId) {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let id = LocalId::new(raw).unwrap();
    store
        .insert(&ReportRecord::new(
            id.clone(),
            ReportPayload::new("Pothole", "roads", Coordinates::new(1.0, 1.0)),
            Utc::now(),
        ))
        .unwrap();
    let outbox = Outbox::new(store, Arc::new(SystemClock), &SyncConfig::default());
    (outbox, id)
}

#[test]
fn failed_record_is_requeued_with_fresh_budget() {
    let (outbox, id) = outbox_with("tab-1-0");
    outbox.mark_syncing(&id).unwrap();
    outbox
        .mark_failed(&id, "category unknown", FailureKind::Permanent)
        .unwrap();
    assert_eq!(outbox.exhausted_count().unwrap(), 1);

    run_impl(&outbox, &id).unwrap();

    let record = outbox.store().get(&id).unwrap();
    assert_eq!(record.state, SyncState::Pending);
    assert_eq!(record.attempts, 0);
    assert_eq!(outbox.exhausted_count().unwrap(), 0);
}

#[test]
fn pending_record_is_not_retryable() {
    let (outbox, id) = outbox_with("tab-1-0");
    let err = run_impl(&outbox, &id).unwrap_err();
    assert!(matches!(err, Error::NotRetryable { ref state, .. } if state == "pending"));
}

#[test]
fn synced_record_is_not_retryable() {
    let (outbox, id) = outbox_with("tab-1-0");
    outbox.mark_syncing(&id).unwrap();
    outbox
        .mark_synced(&id, kb_core::RemoteId::new("rpt-000001"))
        .unwrap();

    assert!(run_impl(&outbox, &id).is_err());
    assert!(matches!(
        outbox.store().get(&id).unwrap().state,
        SyncState::Synced { .. }
    ));
}

#[test]
fn unknown_record_is_not_found() {
    let (outbox, _) = outbox_with("tab-1-0");
    let missing = LocalId::new("tab-9-9").unwrap();
    assert!(matches!(
        run_impl(&outbox, &missing),
        Err(Error::ReportNotFound(_))
    ));
}

#[test]
fn record_picked_up_by_a_sync_is_not_requeued() {
    let (outbox, id) = outbox_with("tab-1-0");
    outbox.mark_syncing(&id).unwrap();
    outbox
        .mark_failed(&id, "timeout", FailureKind::Transient)
        .unwrap();
    // A running engine retries it before the user does.
    outbox.mark_syncing(&id).unwrap();

    let err = run_impl(&outbox, &id).unwrap_err();
    assert!(matches!(err, Error::NotRetryable { ref state, .. } if state == "syncing"));
    assert_eq!(outbox.store().get(&id).unwrap().state, SyncState::Syncing);
}
