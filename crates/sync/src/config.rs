// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sync engine tuning knobs and the retry backoff policy.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Result, SyncError};

/// Tunables for the sync engine. Every field has a default, so a partial
/// `[sync]` table deserializes cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Failed attempts after which a record stops being retried automatically.
    pub max_attempts: u32,
    /// Backoff base delay in milliseconds.
    pub base_delay_ms: u64,
    /// Backoff ceiling in milliseconds.
    pub max_delay_ms: u64,
    /// Submissions in flight at once during a run.
    pub concurrency: usize,
    /// Per-submission timeout in milliseconds. A timeout is a transient failure.
    pub submit_timeout_ms: u64,
    /// How long the raw reachability flag must hold still before it counts.
    pub debounce_ms: u64,
    /// Poll interval for reachability probes in milliseconds.
    pub probe_interval_ms: u64,
    /// Timeout for a single reachability probe in milliseconds.
    pub probe_timeout_ms: u64,
    /// Capacity of the sync and connectivity event channels.
    pub event_buffer: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            max_attempts: 5,
            base_delay_ms: 1_000,
            max_delay_ms: 300_000,
            concurrency: 3,
            submit_timeout_ms: 30_000,
            debounce_ms: 750,
            probe_interval_ms: 5_000,
            probe_timeout_ms: 2_000,
            event_buffer: 256,
        }
    }
}

impl SyncConfig {
    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(SyncError::InvalidConfig(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(SyncError::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.event_buffer == 0 {
            return Err(SyncError::InvalidConfig(
                "event_buffer must be at least 1".to_string(),
            ));
        }
        if self.base_delay_ms > self.max_delay_ms {
            return Err(SyncError::InvalidConfig(format!(
                "base_delay_ms ({}) exceeds max_delay_ms ({})",
                self.base_delay_ms, self.max_delay_ms
            )));
        }
        Ok(())
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::new(self.base_delay_ms, self.max_delay_ms)
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_millis(self.submit_timeout_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

/// Exponential backoff with a ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base_ms: u64,
    max_ms: u64,
}

impl Backoff {
    pub fn new(base_ms: u64, max_ms: u64) -> Self {
        Backoff { base_ms, max_ms }
    }

    /// Delay before the next retry of a record that has failed `attempts` times:
    /// `min(2^attempts * base, max)`.
    pub fn delay_for(&self, attempts: u32) -> Duration {
        let factor = 2u64.checked_pow(attempts).unwrap_or(u64::MAX);
        let ms = self.base_ms.saturating_mul(factor).min(self.max_ms);
        Duration::from_millis(ms)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
