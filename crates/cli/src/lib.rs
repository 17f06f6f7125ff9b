// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! kerbrs - the library behind the `kerb` field-report CLI.
//!
//! Reports are captured into a device-local SQLite store and submitted to a
//! remote service by the sync engine in `kb-sync`.
//!
//! # Main Components
//!
//! - [`Config`] - Project configuration (device id, remote, sync tuning)
//! - [`Error`] - User-facing errors with hints
//! - [`Cli`] - The clap command tree
//!
//! # Project layout
//!
//! ```text
//! .kerb/
//!   config.toml   device, [remote], [sync]
//!   reports.db    report store and offline cache
//!   sync.lock     held by `kerb sync` / `kerb run`
//!   sync.log      `kerb run` log output
//! ```

mod cli;
mod commands;
mod display;
mod lock;
mod logging;

pub mod config;
pub mod error;

pub use cli::{CacheCommand, Cli, Command, OutputFormat, StateArg};
pub use config::{find_work_dir, init_work_dir, Config, RemoteConfig};
pub use error::{Error, Result};

use commands::new::NewReport;

/// Execute a parsed command line. This is the main entry point for library
/// users and provides a testable way to run commands without process execution.
pub fn run(cli: Cli) -> Result<()> {
    if let Some(dir) = &cli.directory {
        std::env::set_current_dir(dir)?;
    }
    init_logging(&cli.command);
    run_command(cli.command)
}

fn run_command(command: Command) -> Result<()> {
    match command {
        Command::Init {
            remote,
            device,
            path,
        } => commands::init::run(remote, device, path),
        Command::New {
            title,
            category,
            lat,
            lon,
            description,
            image,
            output,
        } => commands::new::run(
            NewReport {
                title,
                category,
                lat,
                lon,
                description,
                image,
            },
            output,
        ),
        Command::List { state, output } => commands::list::run(state.map(Into::into), output),
        Command::Show { id, output } => commands::show::run(&id, output),
        Command::Status { output } => commands::status::run(output),
        Command::Sync { output } => commands::sync::run(output),
        Command::Run => commands::run::run(),
        Command::Retry { ids, all } => commands::retry::run(&ids, all),
        Command::Cache(cmd) => commands::cache::run(cmd),
    }
}

/// `kerb run` logs to `.kerb/sync.log` at info; everything else to stderr at warn.
fn init_logging(command: &Command) {
    match command {
        Command::Run => match find_work_dir() {
            Ok(work_dir) => logging::init_file(&config::get_log_path(&work_dir), "info"),
            Err(_) => logging::init_stderr("info"),
        },
        _ => logging::init_stderr("warn"),
    }
}
