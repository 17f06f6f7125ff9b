// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use tempfile::TempDir;

#[test]
fn second_acquire_fails_while_held() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("sync.lock");

    let _held = SyncLock::acquire(&path).unwrap();
    assert!(matches!(SyncLock::acquire(&path), Err(Error::SyncLocked)));
}

#[test]
fn lock_is_released_on_drop() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("sync.lock");

    drop(SyncLock::acquire(&path).unwrap());
    assert!(SyncLock::acquire(&path).is_ok());
}
