// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, Utc};
use serde::Serialize;

use kb_sync::{Outbox, StatusCounts};

use super::Project;
use crate::cli::OutputFormat;
use crate::display::format_status;
use crate::error::Result;

/// JSON output for `kerb status`.
#[derive(Debug, Serialize)]
pub(crate) struct StatusJson {
    pending: usize,
    syncing: usize,
    synced: usize,
    failed: usize,
    exhausted: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_retry_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remote: Option<String>,
}

pub fn run(output: OutputFormat) -> Result<()> {
    let project = Project::open()?;
    let outbox = project.outbox();
    let (counts, next_retry) = run_impl(&outbox)?;

    match output {
        OutputFormat::Json => super::print_json(&StatusJson {
            pending: counts.pending_count(),
            syncing: counts.syncing,
            synced: counts.synced,
            failed: counts.failed_count(),
            exhausted: counts.exhausted_count(),
            next_retry_at: next_retry,
            remote: project.config.remote.as_ref().map(|r| r.url.clone()),
        })?,
        OutputFormat::Text | OutputFormat::Id => {
            for line in format_status(&counts, next_retry) {
                println!("{}", line);
            }
            if project.config.remote.is_none() {
                println!();
                println!("No remote configured; reports stay on this device.");
            }
        }
    }
    Ok(())
}

pub(crate) fn run_impl(outbox: &Outbox) -> Result<(StatusCounts, Option<DateTime<Utc>>)> {
    Ok((outbox.counts()?, outbox.next_retry_at()?))
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
