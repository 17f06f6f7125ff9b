// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Project configuration management.
//!
//! Configuration is stored in `.kerb/config.toml` and includes:
//! - `device`: the salt that makes this device's local ids unique
//! - `[remote]`: the submission server (`ws://` or `wss://`)
//! - `[sync]`: retry, concurrency and timing knobs for the sync engine

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

use kb_core::validate_device;
use kb_sync::SyncConfig;

use crate::error::{Error, Result};

const WORK_DIR_NAME: &str = ".kerb";
const CONFIG_FILE_NAME: &str = "config.toml";
const DB_FILE_NAME: &str = "reports.db";
const LOCK_FILE_NAME: &str = "sync.lock";
const LOG_FILE_NAME: &str = "sync.log";
const GITIGNORE_FILE_NAME: &str = ".gitignore";

/// Project configuration stored in `.kerb/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Device salt for local ids (1-32 lowercase alphanumerics).
    pub device: String,
    /// Submission server (optional - without it reports stay local).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteConfig>,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Remote submission server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// WebSocket URL: `ws://...` or `wss://...`.
    pub url: String,
}

impl RemoteConfig {
    /// Validates the URL: a `ws` or `wss` scheme and a host.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        match Url::parse(&url) {
            Ok(parsed)
                if matches!(parsed.scheme(), "ws" | "wss")
                    && parsed.host_str().is_some_and(|host| !host.is_empty()) =>
            {
                Ok(RemoteConfig { url })
            }
            _ => Err(Error::InvalidRemoteUrl(url)),
        }
    }
}

impl Config {
    /// Creates a new config for the given device.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDevice`] if the device salt is not 1-32 lowercase alphanumerics.
    pub fn new(device: String) -> Result<Self> {
        if !validate_device(&device) {
            return Err(Error::InvalidDevice(device));
        }
        Ok(Config {
            device,
            remote: None,
            sync: SyncConfig::default(),
        })
    }

    /// Loads configuration from the given `.kerb/` directory.
    pub fn load(work_dir: &Path) -> Result<Self> {
        let config_path = work_dir.join(CONFIG_FILE_NAME);
        let content = fs::read_to_string(&config_path)
            .map_err(|e| Error::Config(format!("failed to read config: {}", e)))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        if !validate_device(&config.device) {
            return Err(Error::InvalidDevice(config.device));
        }
        if let Some(remote) = &config.remote {
            RemoteConfig::new(remote.url.clone())?;
        }
        config.sync.validate()?;
        Ok(config)
    }

    /// Returns the remote URL, or [`Error::NoRemote`].
    pub fn remote_url(&self) -> Result<&str> {
        self.remote
            .as_ref()
            .map(|r| r.url.as_str())
            .ok_or(Error::NoRemote)
    }

    /// Saves configuration to the given `.kerb/` directory.
    pub fn save(&self, work_dir: &Path) -> Result<()> {
        let config_path = work_dir.join(CONFIG_FILE_NAME);
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
        fs::write(&config_path, content)?;
        Ok(())
    }
}

/// Find the .kerb directory by walking up from the current directory
pub fn find_work_dir() -> Result<PathBuf> {
    let mut current = std::env::current_dir()?;
    loop {
        let work_dir = current.join(WORK_DIR_NAME);
        if work_dir.join(CONFIG_FILE_NAME).is_file() {
            return Ok(work_dir);
        }
        if !current.pop() {
            return Err(Error::NotInitialized);
        }
    }
}

pub fn get_db_path(work_dir: &Path) -> PathBuf {
    work_dir.join(DB_FILE_NAME)
}

pub fn get_lock_path(work_dir: &Path) -> PathBuf {
    work_dir.join(LOCK_FILE_NAME)
}

pub fn get_log_path(work_dir: &Path) -> PathBuf {
    work_dir.join(LOG_FILE_NAME)
}

/// Initialize a new .kerb directory at the given path
pub fn init_work_dir(path: &Path, config: &Config) -> Result<PathBuf> {
    let work_dir = path.join(WORK_DIR_NAME);

    if work_dir.join(CONFIG_FILE_NAME).exists() {
        return Err(Error::AlreadyInitialized(work_dir.display().to_string()));
    }

    fs::create_dir_all(&work_dir)?;
    config.save(&work_dir)?;

    Ok(work_dir)
}

/// Write a .gitignore file to the work directory.
///
/// The store, lock and log are device-local and never committed.
pub fn write_gitignore(work_dir: &Path) -> Result<()> {
    let content = "# Device-local report store\nreports.db\nreports.db-wal\nreports.db-shm\n\n# Sync runtime state\nsync.lock\nsync.log\n";
    fs::write(work_dir.join(GITIGNORE_FILE_NAME), content)?;
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
