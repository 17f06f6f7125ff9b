// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use chrono::Utc;

use kb_core::{ClockSource, Coordinates, LocalIdGenerator, ReportPayload, ReportRecord, Store};

use super::Project;
use crate::cli::OutputFormat;
use crate::error::{Error, Result};

/// Attempts at a fresh local id before giving up.
const MAX_ID_ATTEMPTS: usize = 5;

/// User input for a new report.
#[derive(Debug, Clone)]
pub struct NewReport {
    pub title: String,
    pub category: String,
    pub lat: f64,
    pub lon: f64,
    pub description: Option<String>,
    pub image: Option<String>,
}

impl NewReport {
    /// Trim and check the input, producing the payload to store.
    pub fn into_payload(self) -> Result<ReportPayload> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(Error::FieldEmpty { field: "Title" });
        }
        let category = self.category.trim().to_lowercase();
        if category.is_empty() {
            return Err(Error::FieldEmpty { field: "Category" });
        }
        let coordinates = Coordinates::new(self.lat, self.lon);
        if !coordinates.is_valid() {
            return Err(Error::InvalidCoordinates {
                latitude: self.lat,
                longitude: self.lon,
            });
        }

        let mut payload = ReportPayload::new(title, category, coordinates);
        if let Some(description) = self.description {
            payload = payload.with_description(description.trim());
        }
        if let Some(image) = self.image.filter(|i| !i.trim().is_empty()) {
            payload = payload.with_image(image);
        }
        Ok(payload)
    }
}

pub fn run(report: NewReport, output: OutputFormat) -> Result<()> {
    let project = Project::open()?;
    let generator = LocalIdGenerator::new(&project.config.device)?;
    let record = run_impl(&project.store, &generator, report)?;

    match output {
        OutputFormat::Text => {
            println!("Created {}: {}", record.local_id, record.payload.title);
            let next = match &project.config.remote {
                Some(_) => "it will be submitted on the next sync",
                None => "no remote is configured to submit it to",
            };
            println!("Saved on this device; {}.", next);
        }
        OutputFormat::Id => println!("{}", record.local_id),
        OutputFormat::Json => super::print_json(&record)?,
    }
    Ok(())
}

/// Store a new `Pending` report under a freshly generated local id.
///
/// An id collision with an existing record (only possible after the wall
/// clock went backwards across restarts) is retried with the next id.
pub(crate) fn run_impl<C: ClockSource>(
    store: &Store,
    generator: &LocalIdGenerator<C>,
    report: NewReport,
) -> Result<ReportRecord> {
    let payload = report.into_payload()?;

    for _ in 0..MAX_ID_ATTEMPTS {
        let record = ReportRecord::new(generator.next_id(), payload.clone(), Utc::now());
        match store.insert(&record) {
            Ok(()) => return Ok(record),
            Err(kb_core::Error::DuplicateId(id)) => {
                tracing::debug!("Local id {} already taken, retrying", id);
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(Error::IdGenerationFailed)
}

#[cfg(test)]
#[path = "new_tests.rs"]
mod tests;
