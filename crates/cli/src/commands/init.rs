// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use kb_core::{validate_device, Store};

use crate::config::{get_db_path, init_work_dir, write_gitignore, Config, RemoteConfig};
use crate::error::{Error, Result};

/// Longest directory-derived device prefix; leaves room for the suffix.
const DEVICE_PREFIX_LEN: usize = 24;

pub fn run(remote: Option<String>, device: Option<String>, path: Option<String>) -> Result<()> {
    let target_path = match path {
        Some(p) => PathBuf::from(p),
        None => std::env::current_dir()?,
    };

    let device = match device {
        Some(d) => d,
        None => derive_device_from_path(&target_path, entropy()),
    };
    if !validate_device(&device) {
        return Err(Error::InvalidDevice(device));
    }

    let mut config = Config::new(device)?;
    if let Some(url) = remote {
        config.remote = Some(RemoteConfig::new(url)?);
    }

    let work_dir = init_work_dir(&target_path, &config)?;
    Store::open(&get_db_path(&work_dir))?;
    write_gitignore(&work_dir)?;

    println!("Initialized kerb at {}", work_dir.display());
    println!("Device: {}", config.device);
    match &config.remote {
        Some(remote) => println!("Remote: {}", remote.url),
        None => println!("Remote: none (reports stay on this device)"),
    }

    Ok(())
}

/// Device id from the directory name plus a random-ish suffix, so two
/// devices initialized in same-named directories still get distinct ids.
pub(crate) fn derive_device_from_path(path: &Path, entropy: u32) -> String {
    let base: String = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .take(DEVICE_PREFIX_LEN)
        .collect();
    let base = if base.is_empty() { "dev".to_string() } else { base };
    format!("{}{:06x}", base, entropy & 0x00ff_ffff)
}

fn entropy() -> u32 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or_default();
    nanos ^ std::process::id().rotate_left(16)
}

#[cfg(test)]
#[path = "init_tests.rs"]
mod tests;
