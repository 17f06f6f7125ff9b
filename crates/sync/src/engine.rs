// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Engine assembly.
//!
//! [`SyncEngine`] wires the outbox, the connectivity monitor and the
//! coordinator together and owns their background tasks:
//! - the debounce task inside the monitor
//! - the coordinator loop, the only task that submits
//! - a forwarder turning `GainedConnectivity` events into triggers

use std::sync::Arc;

use futures_util::stream::Stream;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use kb_core::{ClockSource, LocalId, ReportPayload, ReportRecord, Store, SystemClock};

use crate::config::SyncConfig;
use crate::connectivity::{ConnectivityEvent, ConnectivityKind, ConnectivityMonitor};
use crate::coordinator::{EngineHealth, RunReport, SyncCoordinator, Trigger, TriggerOutcome};
use crate::error::{Result, SyncError};
use crate::outbox::Outbox;
use crate::remote::RemoteSubmitter;
use crate::status::{StatusCounts, SyncEvent};

/// A running sync engine.
pub struct SyncEngine {
    outbox: Arc<Outbox>,
    coordinator: Arc<SyncCoordinator>,
    monitor: ConnectivityMonitor,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl SyncEngine {
    /// Start an engine on the system clock. Must be called inside a Tokio runtime.
    pub fn start(
        store: Arc<Store>,
        remote: Arc<dyn RemoteSubmitter>,
        reachability: watch::Receiver<bool>,
        config: SyncConfig,
    ) -> Result<Self> {
        Self::start_with_clock(store, remote, reachability, config, Arc::new(SystemClock))
    }

    /// Start an engine.
    ///
    /// Resets records stranded in `Syncing` by a previous process, then starts
    /// the background tasks. If the device is online at startup one
    /// [`Trigger::Resume`] run is requested.
    pub fn start_with_clock(
        store: Arc<Store>,
        remote: Arc<dyn RemoteSubmitter>,
        reachability: watch::Receiver<bool>,
        config: SyncConfig,
        clock: Arc<dyn ClockSource>,
    ) -> Result<Self> {
        config.validate()?;

        let outbox = Arc::new(Outbox::new(store, Arc::clone(&clock), &config));
        let recovered = outbox.recover_stale()?;
        if !recovered.is_empty() {
            info!("Reset {} interrupted submissions to pending", recovered.len());
        }

        let monitor =
            ConnectivityMonitor::spawn(reachability, config.debounce(), clock, config.event_buffer);
        let (coordinator, triggers) = SyncCoordinator::new(
            Arc::clone(&outbox),
            remote,
            monitor.watch(),
            config.concurrency,
            config.submit_timeout(),
        );

        let cancel = CancellationToken::new();
        let mut tasks = Vec::with_capacity(2);
        tasks.push(tokio::spawn(Arc::clone(&coordinator).run_loop(triggers)));
        tasks.push(tokio::spawn(forward_connectivity(
            monitor.subscribe(),
            Arc::clone(&coordinator),
            cancel.clone(),
        )));

        if monitor.is_online() {
            coordinator.request(Trigger::Resume);
        }
        info!(
            "Sync engine started ({})",
            if monitor.is_online() { "online" } else { "offline" }
        );

        Ok(SyncEngine {
            outbox,
            coordinator,
            monitor,
            cancel,
            tasks,
        })
    }

    /// Persist a new report and request a run for it.
    ///
    /// The report is durable once this returns, whatever happens to the run.
    pub fn submit_report(&self, local_id: LocalId, payload: ReportPayload) -> Result<ReportRecord> {
        if self.cancel.is_cancelled() {
            return Err(SyncError::Stopped);
        }
        let record = self.outbox.enqueue(local_id, payload)?;
        self.coordinator.request(Trigger::Enqueued);
        Ok(record)
    }

    /// Manual sync request (pull to refresh).
    pub fn request_sync(&self) -> TriggerOutcome {
        self.coordinator.request(Trigger::Manual)
    }

    /// The app came back to the foreground.
    pub fn notify_resumed(&self) -> TriggerOutcome {
        self.coordinator.request(Trigger::Resume)
    }

    pub fn status(&self) -> Result<StatusCounts> {
        Ok(self.outbox.counts()?)
    }

    pub fn pending_count(&self) -> Result<usize> {
        Ok(self.outbox.pending_count()?)
    }

    pub fn failed_count(&self) -> Result<usize> {
        Ok(self.outbox.failed_count()?)
    }

    pub fn exhausted_count(&self) -> Result<usize> {
        Ok(self.outbox.exhausted_count()?)
    }

    /// Live per-record state changes.
    pub fn sync_events(&self) -> impl Stream<Item = SyncEvent> + Send + Unpin {
        self.outbox.events()
    }

    pub fn subscribe_sync_events(&self) -> broadcast::Receiver<SyncEvent> {
        self.outbox.subscribe()
    }

    /// Live debounced connectivity transitions.
    pub fn connectivity_events(&self) -> impl Stream<Item = ConnectivityEvent> + Send + Unpin {
        self.monitor.events()
    }

    pub fn subscribe_run_reports(&self) -> broadcast::Receiver<RunReport> {
        self.coordinator.subscribe_reports()
    }

    pub fn is_online(&self) -> bool {
        self.monitor.is_online()
    }

    pub fn health(&self) -> EngineHealth {
        self.coordinator.health()
    }

    pub fn watch_health(&self) -> watch::Receiver<EngineHealth> {
        self.coordinator.watch_health()
    }

    pub fn outbox(&self) -> &Arc<Outbox> {
        &self.outbox
    }

    /// Stop all background work. A run in progress stops at the next record
    /// boundary; its in-flight submissions are awaited.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        self.coordinator.cancel();
        for task in self.tasks {
            let _ = task.await;
        }
        self.monitor.stop().await;
        debug!("Sync engine stopped");
    }
}

/// Push `GainedConnectivity` into the coordinator's trigger queue.
///
/// Never blocks the monitor: a slow forwarder loses events, not the monitor.
async fn forward_connectivity(
    mut events: broadcast::Receiver<ConnectivityEvent>,
    coordinator: Arc<SyncCoordinator>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => return,
            event = events.recv() => event,
        };
        match event {
            Ok(ConnectivityEvent {
                kind: ConnectivityKind::GainedConnectivity,
                ..
            }) => {
                let outcome = coordinator.request(Trigger::Connectivity);
                debug!("Connectivity regained, trigger {:?}", outcome);
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("Connectivity forwarder lagged by {} events", n);
                // Missed events may include a gain; the current state decides.
                if coordinator.is_online() {
                    coordinator.request(Trigger::Connectivity);
                }
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
