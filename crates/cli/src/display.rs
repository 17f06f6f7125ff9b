// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Text rendering for reports, status and run reports.

use chrono::{DateTime, Utc};

use kb_core::{ReportRecord, SyncState};
use kb_sync::{AbortReason, RunReport, StatusCounts};

/// Maximum line width for wrapped descriptions (excluding indent).
const WRAP_WIDTH: usize = 76;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Wrap a single-line text at word boundaries; multi-line text is kept as-is.
pub fn wrap_text(content: &str, width: usize) -> Vec<String> {
    if content.contains('\n') {
        return content.lines().map(str::to_string).collect();
    }

    let mut lines: Vec<String> = Vec::new();
    for word in content.split_whitespace() {
        match lines.last_mut() {
            Some(line) if line.len() + 1 + word.len() <= width => {
                line.push(' ');
                line.push_str(word);
            }
            _ => lines.push(word.to_string()),
        }
    }
    lines
}

/// Short state label: `pending`, `synced rpt-000123`, `failed 2x`, ...
pub fn state_label(record: &ReportRecord, max_attempts: u32) -> String {
    match &record.state {
        SyncState::Pending => "pending".to_string(),
        SyncState::Syncing => "syncing".to_string(),
        SyncState::Synced { remote_id } => format!("synced {}", remote_id),
        SyncState::Failed(failure) if failure.permanent => "rejected".to_string(),
        SyncState::Failed(failure) if failure.attempts >= max_attempts => {
            format!("failed {}x, gave up", failure.attempts)
        }
        SyncState::Failed(failure) => format!("failed {}x", failure.attempts),
    }
}

/// One-line summary for `kerb list`.
pub fn format_report_line(record: &ReportRecord, max_attempts: u32) -> String {
    format!(
        "{} [{}] ({}) {}",
        record.local_id,
        state_label(record, max_attempts),
        record.payload.category,
        record.payload.title
    )
}

/// Multi-line detail view for `kerb show`.
pub fn format_report_detail(record: &ReportRecord, max_attempts: u32) -> Vec<String> {
    let payload = &record.payload;
    let mut lines = vec![
        format!("[{}] {}", payload.category, payload.title),
        format!("Local id: {}", record.local_id),
        format!("State: {}", state_label(record, max_attempts)),
        format!(
            "Location: {:.6}, {:.6}",
            payload.coordinates.latitude, payload.coordinates.longitude
        ),
        format!("Created: {}", record.created_at.format(TIME_FORMAT)),
        format!("Updated: {}", record.updated_at.format(TIME_FORMAT)),
    ];
    if let Some(image) = &payload.image_ref {
        lines.push(format!("Image: {}", image));
    }
    if let SyncState::Failed(failure) = &record.state {
        lines.push(format!("Last error: {}", failure.error));
        match failure.retry_at {
            Some(at) => lines.push(format!("Next retry: {}", format_time(at))),
            None => lines.push("Next retry: none (run 'kerb retry' to requeue)".to_string()),
        }
    }
    if !payload.description.is_empty() {
        lines.push(String::new());
        lines.push("Description:".to_string());
        for line in wrap_text(&payload.description, WRAP_WIDTH) {
            lines.push(format!("  {}", line));
        }
    }
    lines
}

/// Status counts, phrased for the field user.
pub fn format_status(counts: &StatusCounts, next_retry: Option<DateTime<Utc>>) -> Vec<String> {
    let mut lines = vec![format!("Waiting to sync: {}", counts.pending_count())];
    if counts.syncing > 0 {
        lines.push(format!("  in flight: {}", counts.syncing));
    }
    lines.push(format!("Synced: {}", counts.synced));
    lines.push(format!("Will retry automatically: {}", counts.failed_count()));
    if let Some(at) = next_retry {
        lines.push(format!("  next retry: {}", format_time(at)));
    }
    lines.push(format!("Needs your attention: {}", counts.exhausted_count()));
    lines
}

/// Outcome of one sync run.
pub fn format_run_report(report: &RunReport) -> String {
    match report.aborted {
        Some(AbortReason::Offline) => "Offline: nothing was submitted".to_string(),
        _ => {
            let mut summary = format!(
                "Submitted {}: {} synced, {} will retry, {} rejected",
                report.attempted, report.synced, report.failed_transient, report.failed_permanent
            );
            match report.aborted {
                Some(AbortReason::ConnectivityLost) => summary.push_str(" (connection lost)"),
                Some(AbortReason::Cancelled) => summary.push_str(" (cancelled)"),
                Some(AbortReason::Offline) | None => {}
            }
            summary
        }
    }
}

fn format_time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

#[cfg(test)]
#[path = "display_tests.rs"]
mod tests;
