// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use serde::Serialize;

use kb_core::{ReportRecord, Store, SyncStateKind};

use super::Project;
use crate::cli::OutputFormat;
use crate::display::{format_report_line, state_label};
use crate::error::Result;

/// JSON representation of a report for list output.
#[derive(Serialize)]
struct ListReportJson<'a> {
    local_id: &'a str,
    state: SyncStateKind,
    label: String,
    title: &'a str,
    category: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    remote_id: Option<&'a str>,
    attempts: u32,
}

pub fn run(state: Option<SyncStateKind>, output: OutputFormat) -> Result<()> {
    let project = Project::open()?;
    let records = run_impl(&project.store, state)?;
    let max_attempts = project.config.sync.max_attempts;

    match output {
        OutputFormat::Text => {
            if records.is_empty() {
                println!("No reports");
            }
            for record in &records {
                println!("{}", format_report_line(record, max_attempts));
            }
        }
        OutputFormat::Id => {
            for record in &records {
                println!("{}", record.local_id);
            }
        }
        OutputFormat::Json => {
            let json: Vec<_> = records
                .iter()
                .map(|record| ListReportJson {
                    local_id: record.local_id.as_str(),
                    state: record.state.kind(),
                    label: state_label(record, max_attempts),
                    title: &record.payload.title,
                    category: &record.payload.category,
                    remote_id: record.remote_id().map(|r| r.as_str()),
                    attempts: record.attempts,
                })
                .collect();
            super::print_json(&json)?;
        }
    }
    Ok(())
}

/// Reports in creation order, optionally restricted to one state.
pub(crate) fn run_impl(store: &Store, state: Option<SyncStateKind>) -> Result<Vec<ReportRecord>> {
    Ok(match state {
        Some(state) => store.list_by_state(state)?,
        None => store.list_all()?,
    })
}

#[cfg(test)]
#[path = "list_tests.rs"]
mod tests;
