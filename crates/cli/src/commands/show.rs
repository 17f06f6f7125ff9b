// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use super::{parse_local_id, Project};
use crate::cli::OutputFormat;
use crate::display::format_report_detail;
use crate::error::Result;

pub fn run(id: &str, output: OutputFormat) -> Result<()> {
    let project = Project::open()?;
    let record = project.store.get(&parse_local_id(id)?)?;

    match output {
        OutputFormat::Text => {
            for line in format_report_detail(&record, project.config.sync.max_attempts) {
                println!("{}", line);
            }
        }
        OutputFormat::Id => println!("{}", record.local_id),
        OutputFormat::Json => super::print_json(&record)?,
    }
    Ok(())
}
