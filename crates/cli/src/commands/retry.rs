// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use kb_core::{LocalId, SyncStateKind};
use kb_sync::Outbox;

use super::{parse_local_id, Project};
use crate::error::{Error, Result};

pub fn run(ids: &[String], all: bool) -> Result<()> {
    let project = Project::open()?;
    let outbox = project.outbox();

    let targets: Vec<LocalId> = if all {
        outbox
            .exhausted()?
            .into_iter()
            .map(|record| record.local_id)
            .collect()
    } else {
        ids.iter()
            .map(|id| parse_local_id(id))
            .collect::<Result<_>>()?
    };

    if targets.is_empty() {
        println!("Nothing to retry");
        return Ok(());
    }

    for id in &targets {
        run_impl(&outbox, id)?;
        println!("Requeued {}", id);
    }
    Ok(())
}

/// Move one `Failed` record back to `Pending`.
///
/// The state check is repeated inside the store transaction, so a record
/// a running engine picked up in the meantime is refused as well.
pub(crate) fn run_impl(outbox: &Outbox, id: &LocalId) -> Result<()> {
    let record = outbox.store().get(id)?;
    let state = record.state.kind();
    if state != SyncStateKind::Failed {
        return Err(not_retryable(id, state.as_str()));
    }
    match outbox.requeue(id) {
        Err(kb_core::Error::InvalidTransition { from, .. }) => Err(not_retryable(id, &from)),
        other => Ok(other?),
    }
}

fn not_retryable(id: &LocalId, state: &str) -> Error {
    Error::NotRetryable {
        id: id.to_string(),
        state: state.to_string(),
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
