// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use yare::parameterized;

#[parameterized(
    pending_to_syncing = { SyncStateKind::Pending, SyncStateKind::Syncing, true },
    syncing_to_synced = { SyncStateKind::Syncing, SyncStateKind::Synced, true },
    syncing_to_failed = { SyncStateKind::Syncing, SyncStateKind::Failed, true },
    syncing_to_pending = { SyncStateKind::Syncing, SyncStateKind::Pending, false },
    failed_to_syncing = { SyncStateKind::Failed, SyncStateKind::Syncing, true },
    failed_to_pending = { SyncStateKind::Failed, SyncStateKind::Pending, true },
    pending_to_synced = { SyncStateKind::Pending, SyncStateKind::Synced, false },
    pending_to_failed = { SyncStateKind::Pending, SyncStateKind::Failed, false },
    pending_to_pending = { SyncStateKind::Pending, SyncStateKind::Pending, false },
    syncing_to_syncing = { SyncStateKind::Syncing, SyncStateKind::Syncing, false },
    failed_to_synced = { SyncStateKind::Failed, SyncStateKind::Synced, false },
    synced_to_pending = { SyncStateKind::Synced, SyncStateKind::Pending, false },
    synced_to_syncing = { SyncStateKind::Synced, SyncStateKind::Syncing, false },
    synced_to_failed = { SyncStateKind::Synced, SyncStateKind::Failed, false },
    synced_to_synced = { SyncStateKind::Synced, SyncStateKind::Synced, false },
)]
fn transition_table(from: SyncStateKind, to: SyncStateKind, allowed: bool) {
    assert_eq!(from.can_transition_to(to), allowed);
}

#[parameterized(
    pending = { "pending", SyncStateKind::Pending },
    syncing = { "syncing", SyncStateKind::Syncing },
    synced = { "synced", SyncStateKind::Synced },
    failed = { "failed", SyncStateKind::Failed },
    uppercase = { "FAILED", SyncStateKind::Failed },
)]
fn state_kind_parses(raw: &str, expected: SyncStateKind) {
    assert_eq!(raw.parse::<SyncStateKind>().unwrap(), expected);
}

#[test]
fn state_kind_rejects_unknown() {
    assert!(matches!(
        "done".parse::<SyncStateKind>(),
        Err(Error::InvalidState(_))
    ));
}

#[test]
fn only_synced_is_terminal() {
    assert!(SyncStateKind::Synced.is_terminal());
    assert!(!SyncStateKind::Failed.is_terminal());
    assert!(!SyncStateKind::Pending.is_terminal());
}

#[parameterized(
    origin = { 0.0, 0.0, true },
    corners = { -90.0, 180.0, true },
    lat_too_high = { 90.5, 0.0, false },
    lon_too_low = { 0.0, -180.1, false },
    nan = { f64::NAN, 0.0, false },
    infinite = { 0.0, f64::INFINITY, false },
)]
fn coordinates_validity(lat: f64, lon: f64, valid: bool) {
    assert_eq!(Coordinates::new(lat, lon).is_valid(), valid);
}

#[test]
fn new_record_is_pending_without_remote_id() {
    let record = ReportRecord::new(
        LocalId::new("dev1-1-0").unwrap(),
        ReportPayload::new("Pothole", "roads", Coordinates::new(51.5, -0.1)),
        Utc::now(),
    );

    assert_eq!(record.state, SyncState::Pending);
    assert_eq!(record.attempts, 0);
    assert!(record.remote_id().is_none());
    assert!(record.failure().is_none());
}

#[test]
fn synced_record_exposes_remote_id() {
    let mut record = ReportRecord::new(
        LocalId::new("dev1-1-0").unwrap(),
        ReportPayload::new("Pothole", "roads", Coordinates::new(51.5, -0.1)),
        Utc::now(),
    );
    record.state = SyncState::Synced {
        remote_id: RemoteId::new("rpt-000001"),
    };

    assert_eq!(record.remote_id().unwrap().as_str(), "rpt-000001");
    assert_eq!(record.state.kind(), SyncStateKind::Synced);
}

#[test]
fn payload_json_omits_empty_optionals() {
    let payload = ReportPayload::new("Broken light", "lighting", Coordinates::new(1.0, 2.0));
    let json = serde_json::to_string(&payload).unwrap();

    assert!(!json.contains("description"));
    assert!(!json.contains("image_ref"));

    let full = payload
        .with_description("Flickering at night")
        .with_image("file:///photos/1.jpg");
    let parsed: ReportPayload = serde_json::from_str(&serde_json::to_string(&full).unwrap()).unwrap();
    assert_eq!(parsed, full);
}
