// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use clap::{Parser, Subcommand, ValueEnum};
use kb_core::SyncStateKind;

/// Parse a string that must not be empty or whitespace-only.
fn non_empty_string(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        Err("cannot be empty".to_string())
    } else {
        Ok(s.to_string())
    }
}

/// Output format for commands supporting structured output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    /// Local ids only, one per line
    #[value(alias = "ids")]
    Id,
}

/// Sync state filter for `kerb list`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StateArg {
    Pending,
    Syncing,
    Synced,
    Failed,
}

impl From<StateArg> for SyncStateKind {
    fn from(state: StateArg) -> Self {
        match state {
            StateArg::Pending => SyncStateKind::Pending,
            StateArg::Syncing => SyncStateKind::Syncing,
            StateArg::Synced => SyncStateKind::Synced,
            StateArg::Failed => SyncStateKind::Failed,
        }
    }
}

#[derive(Parser)]
#[command(name = "kerb")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Offline-first field reports for civic issues")]
#[command(
    long_about = "Offline-first field reports for civic issues.\n\n\
    Reports are saved on this device first and submitted to the remote service \
    whenever it is reachable."
)]
pub struct Cli {
    /// Run as if kerb was started in <path>
    #[arg(short = 'C', long = "directory", global = true, value_name = "path")]
    pub directory: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Initialize kerb in the current directory
    #[command(after_help = "\
Examples:
  kerb init                               Local-only, device id derived from the directory
  kerb init --remote ws://10.0.0.5:7890   Submit to a kb-remote server
  kerb init --device tablet7              Choose the device id")]
    Init {
        /// Remote submission server (ws:// or wss://)
        #[arg(long)]
        remote: Option<String>,

        /// Device id used to salt local report ids
        #[arg(long)]
        device: Option<String>,

        /// Directory to initialize (default: current directory)
        #[arg(long)]
        path: Option<String>,
    },

    /// Capture a new report
    #[command(after_help = "\
Examples:
  kerb new \"Pothole on Main St\" -c roads --lat 52.52 --lon 13.40
  kerb new \"Broken light\" -c lighting --lat 52.5 --lon 13.4 -d \"Out since Monday\"
  kerb new \"Graffiti\" -c vandalism --lat 52.5 --lon 13.4 --image photos/wall.jpg -o id")]
    New {
        /// Short title of the issue
        #[arg(value_parser = non_empty_string)]
        title: String,

        /// Category (e.g. roads, lighting, waste)
        #[arg(long, short, value_parser = non_empty_string)]
        category: String,

        /// Latitude in degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude in degrees
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Longer description
        #[arg(long, short)]
        description: Option<String>,

        /// Path or URI of a photo taken with the report
        #[arg(long)]
        image: Option<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },

    /// List reports, oldest first
    List {
        /// Only reports in this state
        #[arg(long, short, value_enum)]
        state: Option<StateArg>,

        /// Output format
        #[arg(long, short, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },

    /// Show one report
    Show {
        /// Local id of the report
        id: String,

        /// Output format
        #[arg(long, short, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },

    /// Show sync status counts
    Status {
        /// Output format
        #[arg(long, short, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },

    /// Submit waiting reports once and exit
    Sync {
        /// Output format
        #[arg(long, short, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },

    /// Keep syncing in the foreground until interrupted
    Run,

    /// Put failed reports back in the queue with a fresh attempt budget
    Retry {
        /// Local ids to requeue
        ids: Vec<String>,

        /// Requeue every report that needs attention
        #[arg(long, conflicts_with = "ids")]
        all: bool,
    },

    /// Read and write the offline cache
    #[command(subcommand)]
    Cache(CacheCommand),
}

#[derive(Subcommand)]
pub enum CacheCommand {
    /// Store a value
    Set { key: String, value: String },
    /// Print a value
    Get { key: String },
}

#[cfg(test)]
#[path = "../cli_tests.rs"]
mod tests;
