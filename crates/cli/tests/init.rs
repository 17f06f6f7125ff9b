// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

mod common;
use common::*;
use yare::parameterized;

#[test]
fn creates_work_dir() {
    let temp = TempDir::new().unwrap();

    kerb()
        .args(["init", "--device", "tablet7"])
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized kerb"))
        .stdout(predicate::str::contains("Device: tablet7"))
        .stdout(predicate::str::contains("Remote: none"));

    assert!(temp.path().join(".kerb/config.toml").exists());
    assert!(temp.path().join(".kerb/reports.db").exists());
    assert!(temp.path().join(".kerb/.gitignore").exists());
}

#[test]
fn fails_if_already_initialized() {
    let temp = init_temp();

    kerb()
        .args(["init", "--device", "tablet7"])
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("already initialized"));
}

#[test]
fn derives_device_when_omitted() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("Field_Kit");
    std::fs::create_dir(&dir).unwrap();

    kerb()
        .arg("init")
        .current_dir(&dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Device: fieldkit"));
}

#[test]
fn path_flag_initializes_elsewhere() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("project");
    std::fs::create_dir(&target).unwrap();

    kerb()
        .args(["init", "--device", "tablet7", "--path"])
        .arg(&target)
        .current_dir(temp.path())
        .assert()
        .success();

    assert!(target.join(".kerb/config.toml").exists());
    assert!(!temp.path().join(".kerb").exists());
}

#[test]
fn stores_remote_url() {
    let temp = init_temp_with_remote("ws://10.0.0.5:7890");

    let config = std::fs::read_to_string(temp.path().join(".kerb/config.toml")).unwrap();
    assert!(config.contains("ws://10.0.0.5:7890"));
}

#[parameterized(
    http = { "http://10.0.0.5:7890" },
    bare_host = { "10.0.0.5:7890" },
    empty = { "" },
)]
fn rejects_invalid_remote(url: &str) {
    let temp = TempDir::new().unwrap();

    kerb()
        .args(["init", "--device", "tablet7", "--remote", url])
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid remote URL"));

    assert!(!temp.path().join(".kerb").exists());
}

#[parameterized(
    uppercase = { "Tablet7" },
    dash = { "tablet-7" },
    too_long = { "abcdefghijklmnopqrstuvwxyz0123456789" },
)]
fn rejects_invalid_device(device: &str) {
    let temp = TempDir::new().unwrap();

    kerb()
        .args(["init", "--device", device])
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid device id"));
}

#[test]
fn commands_fail_outside_project() {
    let temp = TempDir::new().unwrap();

    kerb()
        .arg("status")
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"));
}
