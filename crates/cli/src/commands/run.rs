// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Long-running sync loop driven by a TCP reachability probe.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use kb_core::SyncStateKind;
use kb_sync::{
    poll_reachability, ConnectivityKind, EngineHealth, SyncEngine, SyncEvent, TcpProbe, WsRemote,
};

use super::{runtime, Project};
use crate::config::get_lock_path;
use crate::display::format_status;
use crate::error::{Error, Result};
use crate::lock::SyncLock;

pub fn run() -> Result<()> {
    let project = Project::open()?;
    let url = project.config.remote_url()?.to_string();
    let _lock = SyncLock::acquire(&get_lock_path(&project.work_dir))?;

    runtime()?.block_on(run_impl(project, url))
}

async fn run_impl(project: Project, url: String) -> Result<()> {
    let sync = project.config.sync.clone();
    let probe = TcpProbe::from_url(&url, sync.probe_timeout())
        .ok_or_else(|| Error::InvalidRemoteUrl(url.clone()))?;

    let cancel = CancellationToken::new();
    let (reachability, probe_task) =
        poll_reachability(probe, sync.probe_interval(), cancel.clone()).await;

    let engine = SyncEngine::start(
        Arc::clone(&project.store),
        Arc::new(WsRemote::new(url.clone())),
        reachability,
        sync.clone(),
    )?;
    println!("Syncing to {} (Ctrl-C to stop)", url);
    println!("{}", if engine.is_online() { "online" } else { "offline" });

    let mut events = engine.sync_events();
    let mut connectivity = engine.connectivity_events();
    let mut health = engine.watch_health();
    // Reports captured by other `kerb new` processes do not trigger the engine.
    let mut pickup = tokio::time::interval(sync.probe_interval());
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut failure = None;
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
            Some(event) = events.next() => {
                if let Some(line) = format_event(&event) {
                    println!("{}", line);
                }
            }
            Some(event) = connectivity.next() => match event.kind {
                ConnectivityKind::GainedConnectivity => println!("online"),
                ConnectivityKind::LostConnectivity => println!("offline"),
            },
            _ = pickup.tick() => {
                let pending = engine.pending_count();
                match should_pick_up(engine.is_online(), pending) {
                    Ok(true) => {
                        engine.request_sync();
                    }
                    Ok(false) => {}
                    Err(reason) => {
                        error!("Cannot read the outbox: {}", reason);
                        failure = Some(reason);
                        break;
                    }
                }
            }
            changed = health.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = health.borrow_and_update().clone();
                match current {
                    EngineHealth::Running => {}
                    EngineHealth::Stopped => break,
                    EngineHealth::StorageFailure(reason) => {
                        warn!("Sync engine stopped: {}", reason);
                        failure = Some(reason);
                        break;
                    }
                }
            }
        }
    }

    cancel.cancel();
    let _ = probe_task.await;
    let counts = engine.status();
    let next_retry = engine.outbox().next_retry_at();
    engine.shutdown().await;

    if let Some(reason) = failure {
        return Err(Error::SyncStopped(reason));
    }
    println!();
    for line in format_status(&counts?, next_retry?) {
        println!("{}", line);
    }
    Ok(())
}

/// Whether the pickup tick should request a run. A store error ends the loop.
fn should_pick_up(
    online: bool,
    pending: kb_sync::Result<usize>,
) -> std::result::Result<bool, String> {
    match pending {
        Ok(pending) => Ok(online && pending > 0),
        Err(e) => Err(e.to_string()),
    }
}

/// Progress line for settled records; intermediate states are not shown.
fn format_event(event: &SyncEvent) -> Option<String> {
    match event.to {
        SyncStateKind::Synced => Some(format!("synced  {}", event.local_id)),
        SyncStateKind::Failed => Some(format!("failed  {}", event.local_id)),
        SyncStateKind::Pending | SyncStateKind::Syncing => None,
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
