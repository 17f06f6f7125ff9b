// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot sync: probe the remote, drain the outbox once, report.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use kb_sync::{
    Outbox, ReachabilityProbe, RemoteSubmitter, RunOutcome, RunReport, SyncConfig,
    SyncCoordinator, TcpProbe, WsRemote,
};

use super::{runtime, Project};
use crate::cli::OutputFormat;
use crate::config::get_lock_path;
use crate::display::format_run_report;
use crate::error::{Error, Result};
use crate::lock::SyncLock;

pub fn run(output: OutputFormat) -> Result<()> {
    let project = Project::open()?;
    let url = project.config.remote_url()?.to_string();
    let _lock = SyncLock::acquire(&get_lock_path(&project.work_dir))?;

    let sync = project.config.sync.clone();
    let probe = TcpProbe::from_url(&url, sync.probe_timeout())
        .ok_or_else(|| Error::InvalidRemoteUrl(url.clone()))?;
    let outbox = Arc::new(project.outbox());
    let remote: Arc<dyn RemoteSubmitter> = Arc::new(WsRemote::new(url));

    let report = runtime()?.block_on(async {
        let online = probe.probe().await;
        info!("Remote {} is {}", probe.addr(), if online { "reachable" } else { "unreachable" });
        run_impl(outbox, remote, online, &sync).await
    })?;

    match output {
        OutputFormat::Json => super::print_json(&report)?,
        OutputFormat::Text | OutputFormat::Id => println!("{}", format_run_report(&report)),
    }
    Ok(())
}

/// Recover interrupted submissions, then drain once.
pub(crate) async fn run_impl(
    outbox: Arc<Outbox>,
    remote: Arc<dyn RemoteSubmitter>,
    online: bool,
    config: &SyncConfig,
) -> Result<RunReport> {
    let recovered = outbox.recover_stale()?;
    if !recovered.is_empty() {
        info!("Reset {} interrupted submissions", recovered.len());
    }

    let (_online_tx, online_rx) = watch::channel(online);
    let (coordinator, _triggers) = SyncCoordinator::new(
        outbox,
        remote,
        online_rx,
        config.concurrency,
        config.submit_timeout(),
    );

    match coordinator.run_once().await? {
        RunOutcome::Completed(report) => Ok(report),
        RunOutcome::AlreadyDraining => Ok(RunReport::default()),
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
