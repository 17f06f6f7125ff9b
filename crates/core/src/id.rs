// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Report identifiers.
//!
//! A [`LocalId`] is assigned on the device at creation time and is the only
//! stable identity of a report until the remote accepts it. The remote then
//! assigns a [`RemoteId`].
//!
//! Local id format: `{device}-{wall_ms}-{counter}`
//!
//! The counter disambiguates ids generated within the same millisecond and
//! keeps the sequence strictly increasing when the wall clock stalls or goes
//! backwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use crate::clock::{ClockSource, SystemClock};
use crate::error::{Error, Result};

const MAX_ID_LEN: usize = 128;
const MAX_DEVICE_LEN: usize = 32;

/// Device-generated report identifier. Immutable and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LocalId(String);

impl LocalId {
    /// Validates and wraps an identifier string.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() || id.len() > MAX_ID_LEN || id.chars().any(char::is_whitespace) {
            return Err(Error::InvalidLocalId(id));
        }
        Ok(LocalId(id))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LocalId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        LocalId::new(s)
    }
}

impl TryFrom<String> for LocalId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        LocalId::new(value)
    }
}

impl From<LocalId> for String {
    fn from(id: LocalId) -> Self {
        id.0
    }
}

/// Identifier assigned by the remote service once a report is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId(String);

impl RemoteId {
    pub fn new(id: impl Into<String>) -> Self {
        RemoteId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Returns true if `device` is usable as a local id salt.
///
/// Device salts are 1-32 lowercase ASCII alphanumerics so that generated ids
/// split unambiguously on `-`.
pub fn validate_device(device: &str) -> bool {
    !device.is_empty()
        && device.len() <= MAX_DEVICE_LEN
        && device
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

/// Generates strictly increasing local ids for one device.
///
/// Thread-safe. Uniqueness across restarts relies on the wall clock moving
/// forward; the store rejects the rare collision with [`Error::DuplicateId`]
/// and callers retry.
pub struct LocalIdGenerator<C: ClockSource = SystemClock> {
    clock: C,
    device: String,
    /// Last issued (wall_ms, counter).
    last: Mutex<(u64, u32)>,
}

impl LocalIdGenerator<SystemClock> {
    /// Creates a generator on the system clock.
    pub fn new(device: &str) -> Result<Self> {
        Self::with_clock(SystemClock, device)
    }
}

impl<C: ClockSource> LocalIdGenerator<C> {
    /// Creates a generator with a custom clock source.
    pub fn with_clock(clock: C, device: &str) -> Result<Self> {
        if !validate_device(device) {
            return Err(Error::InvalidLocalId(format!(
                "device salt '{device}' must be 1-{MAX_DEVICE_LEN} lowercase alphanumerics"
            )));
        }
        Ok(LocalIdGenerator {
            clock,
            device: device.to_string(),
            last: Mutex::new((0, 0)),
        })
    }

    /// Returns the device salt.
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Issues the next id.
    pub fn next_id(&self) -> LocalId {
        let physical = self.clock.now_ms();
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());

        let (wall_ms, counter) = if physical > last.0 {
            (physical, 0)
        } else {
            (last.0, last.1.saturating_add(1))
        };
        *last = (wall_ms, counter);

        LocalId(format!("{}-{}-{}", self.device, wall_ms, counter))
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
