// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use kb_core::{SyncState, SystemClock};
use std::sync::atomic::{AtomicU64, Ordering};
use yare::parameterized;

fn report(title: &str, category: &str, lat: f64, lon: f64) -> NewReport {
    NewReport {
        title: title.to_string(),
        category: category.to_string(),
        lat,
        lon,
        description: None,
        image: None,
    }
}

/// Clock pinned to one instant, so every generated id shares a timestamp.
struct FixedClock(AtomicU64);

impl ClockSource for FixedClock {
    fn now_ms(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[test]
fn creates_pending_record() {
    let store = Store::open_in_memory().unwrap();
    let generator = LocalIdGenerator::new("tab").unwrap();

    let mut input = report("  Pothole ", "Roads", 52.5, 13.4);
    input.description = Some(" deep \n".to_string());
    input.image = Some("photos/1.jpg".to_string());
    let record = run_impl(&store, &generator, input).unwrap();

    assert!(record.local_id.as_str().starts_with("tab-"));
    assert_eq!(record.state, SyncState::Pending);
    assert_eq!(record.payload.title, "Pothole");
    assert_eq!(record.payload.category, "roads");
    assert_eq!(record.payload.description, "deep");
    assert_eq!(record.payload.image_ref.as_deref(), Some("photos/1.jpg"));
    assert_eq!(store.get(&record.local_id).unwrap().payload, record.payload);
}

#[test]
fn ids_are_unique_across_reports() {
    let store = Store::open_in_memory().unwrap();
    let generator = LocalIdGenerator::new("tab").unwrap();

    let a = run_impl(&store, &generator, report("a", "roads", 0.0, 0.0)).unwrap();
    let b = run_impl(&store, &generator, report("b", "roads", 0.0, 0.0)).unwrap();
    assert_ne!(a.local_id, b.local_id);
}

#[test]
fn collision_after_restart_is_retried() {
    let store = Store::open_in_memory().unwrap();

    // A previous process already used the first two ids of this millisecond.
    let earlier = LocalIdGenerator::with_clock(FixedClock(AtomicU64::new(1_000)), "tab").unwrap();
    run_impl(&store, &earlier, report("a", "roads", 0.0, 0.0)).unwrap();
    run_impl(&store, &earlier, report("b", "roads", 0.0, 0.0)).unwrap();

    let restarted =
        LocalIdGenerator::with_clock(FixedClock(AtomicU64::new(1_000)), "tab").unwrap();
    let record = run_impl(&store, &restarted, report("c", "roads", 0.0, 0.0)).unwrap();
    assert_eq!(record.local_id.as_str(), "tab-1000-2");
}

#[test]
fn gives_up_after_repeated_collisions() {
    let store = Store::open_in_memory().unwrap();
    let earlier = LocalIdGenerator::with_clock(FixedClock(AtomicU64::new(1_000)), "tab").unwrap();
    for i in 0..MAX_ID_ATTEMPTS {
        run_impl(&store, &earlier, report(&format!("r{i}"), "roads", 0.0, 0.0)).unwrap();
    }

    let restarted =
        LocalIdGenerator::with_clock(FixedClock(AtomicU64::new(1_000)), "tab").unwrap();
    let result = run_impl(&store, &restarted, report("late", "roads", 0.0, 0.0));
    assert!(matches!(result, Err(Error::IdGenerationFailed)));
}

#[parameterized(
    empty_title = { report(" ", "roads", 0.0, 0.0) },
    empty_category = { report("t", " ", 0.0, 0.0) },
    lat_too_high = { report("t", "roads", 90.5, 0.0) },
    lon_too_low = { report("t", "roads", 0.0, -180.5) },
    not_a_number = { report("t", "roads", f64::NAN, 0.0) },
)]
fn invalid_input_is_rejected(input: NewReport) {
    let store = Store::open_in_memory().unwrap();
    let generator = LocalIdGenerator::with_clock(SystemClock, "tab").unwrap();
    assert!(run_impl(&store, &generator, input).is_err());
    assert!(store.list_all().unwrap().is_empty());
}
