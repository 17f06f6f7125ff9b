// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod cache;
pub mod init;
pub mod list;
pub mod new;
pub mod retry;
pub mod run;
pub mod show;
pub mod status;
pub mod sync;

use std::path::PathBuf;
use std::sync::Arc;

use kb_core::{LocalId, Store, SystemClock};
use kb_sync::Outbox;

use crate::config::{find_work_dir, get_db_path, Config};
use crate::error::{Error, Result};

/// An opened project: its `.kerb/` directory, config and report store.
pub struct Project {
    pub work_dir: PathBuf,
    pub config: Config,
    pub store: Arc<Store>,
}

impl Project {
    /// Find and open the project containing the current directory.
    pub fn open() -> Result<Self> {
        let work_dir = find_work_dir()?;
        let config = Config::load(&work_dir)?;
        let store = Store::open(&get_db_path(&work_dir))?;
        Ok(Project {
            work_dir,
            config,
            store: Arc::new(store),
        })
    }

    /// Outbox over this project's store on the system clock.
    pub fn outbox(&self) -> Outbox {
        Outbox::new(
            Arc::clone(&self.store),
            Arc::new(SystemClock),
            &self.config.sync,
        )
    }
}

/// Parse a user-supplied local id.
pub fn parse_local_id(raw: &str) -> Result<LocalId> {
    LocalId::new(raw.trim()).map_err(|_| Error::InvalidLocalId(raw.to_string()))
}

/// Runtime for commands that talk to the network.
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
