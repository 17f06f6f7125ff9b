// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Offline cache accessors (e.g. category lists fetched while online).

use super::Project;
use crate::cli::CacheCommand;
use crate::error::{Error, Result};

pub fn run(cmd: CacheCommand) -> Result<()> {
    let project = Project::open()?;
    match cmd {
        CacheCommand::Set { key, value } => {
            project.store.put(&key, &value)?;
        }
        CacheCommand::Get { key } => match project.store.get_cache(&key)? {
            Some(entry) => println!("{}", entry.value),
            None => return Err(Error::CacheMiss(key)),
        },
    }
    Ok(())
}
