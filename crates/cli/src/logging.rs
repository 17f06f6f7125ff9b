// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing setup for the CLI.
//!
//! `KERB_LOG` takes an `EnvFilter` directive (e.g. `debug` or
//! `kb_sync=trace`). Short commands log to stderr; `kerb run` appends to
//! `.kerb/sync.log` and falls back to stderr if the file cannot be opened.

use std::fs;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "KERB_LOG";

/// Build the filter from `KERB_LOG`, or `default` when unset or invalid.
pub fn filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default))
}

/// Log to stderr. A second call is a no-op.
pub fn init_stderr(default: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(default))
        .with_writer(std::io::stderr)
        .try_init();
}

/// Append to `log_path`, falling back to stderr.
pub fn init_file(log_path: &Path, default: &str) {
    match fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
    {
        Ok(file) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter(default))
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .try_init();
        }
        Err(_) => init_stderr(default),
    }
}
