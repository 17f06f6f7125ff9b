// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    not_found = { kb_core::Error::NotFound("dev-1-0".into()), "report not found: dev-1-0" },
    invalid_state = { kb_core::Error::InvalidState("done".into()), "valid states are" },
    duplicate = { kb_core::Error::DuplicateId("dev-1-0".into()), "local store error" },
    poisoned = { kb_core::Error::LockPoisoned, "local store error" },
    corrupted = { kb_core::Error::CorruptedData("bad row".into()), "corrupted data in store" },
)]
fn core_errors_map_to_user_messages(err: kb_core::Error, expected: &str) {
    let mapped: Error = err.into();
    assert!(
        mapped.to_string().contains(expected),
        "'{}' should contain '{}'",
        mapped,
        expected
    );
}

#[test]
fn transition_errors_keep_their_states() {
    let err: Error = kb_core::Error::InvalidTransition {
        local_id: "dev-1-0".into(),
        from: "synced".into(),
        to: "pending".into(),
    }
    .into();
    assert_eq!(
        err.to_string(),
        "report dev-1-0 cannot go from synced to pending"
    );
}

#[test]
fn sync_errors_unwrap_store_failures() {
    let err: Error = kb_sync::SyncError::Store(kb_core::Error::NotFound("x".into())).into();
    assert!(matches!(err, Error::ReportNotFound(id) if id == "x"));

    let err: Error = kb_sync::SyncError::InvalidConfig("concurrency must be at least 1".into()).into();
    assert!(err.to_string().contains("concurrency"));
}

#[test]
fn hints_are_on_their_own_line() {
    let msg = Error::NoRemote.to_string();
    assert!(msg.contains("\n  hint:"));
    let msg = Error::SyncLocked.to_string();
    assert!(msg.contains("\n  hint:"));
}
