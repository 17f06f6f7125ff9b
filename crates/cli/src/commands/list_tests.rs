// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use chrono::{Duration, TimeZone, Utc};
use kb_core::{Coordinates, LocalId, ReportPayload, RemoteId, SyncState};
use yare::parameterized;

/// Store with three reports: one pending, one synced, one failed.
fn populated_store() -> Store {
    let store = Store::open_in_memory().unwrap();
    let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
    for (i, title) in ["Pothole", "Broken light", "Graffiti"].iter().enumerate() {
        store
            .insert(&ReportRecord::new(
                LocalId::new(format!("tab-{}-0", i + 1)).unwrap(),
                ReportPayload::new(*title, "roads", Coordinates::new(52.5, 13.4)),
                t0 + Duration::minutes(i as i64),
            ))
            .unwrap();
    }

    let synced = LocalId::new("tab-2-0").unwrap();
    store.update_state(&synced, &SyncState::Syncing).unwrap();
    store
        .update_state(
            &synced,
            &SyncState::Synced {
                remote_id: RemoteId::new("rpt-000001"),
            },
        )
        .unwrap();
    store
}

#[test]
fn lists_all_in_creation_order() {
    let store = populated_store();
    let titles: Vec<String> = run_impl(&store, None)
        .unwrap()
        .into_iter()
        .map(|r| r.payload.title)
        .collect();
    assert_eq!(titles, vec!["Pothole", "Broken light", "Graffiti"]);
}

#[parameterized(
    pending = { SyncStateKind::Pending, 2 },
    synced = { SyncStateKind::Synced, 1 },
    syncing = { SyncStateKind::Syncing, 0 },
    failed = { SyncStateKind::Failed, 0 },
)]
fn filters_by_state(state: SyncStateKind, expected: usize) {
    let store = populated_store();
    let records = run_impl(&store, Some(state)).unwrap();
    assert_eq!(records.len(), expected);
    assert!(records.iter().all(|r| r.state.kind() == state));
}

#[test]
fn empty_store_lists_nothing() {
    let store = Store::open_in_memory().unwrap();
    assert!(run_impl(&store, None).unwrap().is_empty());
}
