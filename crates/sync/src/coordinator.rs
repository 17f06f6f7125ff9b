// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sync coordinator: the only component that talks to the remote.
//!
//! A run moves `Idle → Draining → Idle`. It snapshots the eligible records,
//! submits them oldest first through a bounded worker pool and settles each
//! record from its outcome. Triggers that arrive mid-run coalesce into a
//! single follow-up run.
//!
//! Per-record failures never stop a run. A local store failure does, and
//! also stops the coordinator loop.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, mpsc, watch, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use kb_core::LocalId;

use crate::error::{Result, SyncError};
use crate::outbox::{FailureKind, Outbox};
use crate::remote::{RemoteSubmitter, SubmitOutcome};

/// Why a run was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Connectivity came back.
    Connectivity,
    /// User asked (pull to refresh, `kerb sync`).
    Manual,
    /// App returned to the foreground, or the engine just started.
    Resume,
    /// A new report was stored.
    Enqueued,
    /// A backoff-scheduled retry is due.
    RetryDue,
}

/// What happened to a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// Queued; a run will start.
    Scheduled,
    /// A run is already draining or queued; this trigger folds into it.
    Coalesced,
    /// The coordinator loop is gone.
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    /// Offline when the run started; nothing was attempted.
    Offline,
    /// Connectivity dropped mid-run; unstarted records were left alone.
    ConnectivityLost,
    /// The coordinator was stopped mid-run.
    Cancelled,
}

/// Tally of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Records handed to the remote.
    pub attempted: usize,
    pub synced: usize,
    pub failed_transient: usize,
    pub failed_permanent: usize,
    /// Records dropped from the run by a contract violation.
    pub skipped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<AbortReason>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(RunReport),
    /// Another run holds the drain; nothing was done.
    AlreadyDraining,
}

/// Liveness of the coordinator loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum EngineHealth {
    Running,
    Stopped,
    /// The local store failed; the loop has stopped. A device-level problem,
    /// not a connectivity one.
    StorageFailure(String),
}

/// Settled result of one submission task.
enum Settled {
    Synced,
    Transient,
    Permanent,
    /// The record could not be settled because of a contract violation.
    Skipped,
}

/// Claim on a local id for the duration of one submission.
struct InFlight {
    set: Arc<Mutex<HashSet<LocalId>>>,
    local_id: LocalId,
}

impl InFlight {
    fn claim(set: &Arc<Mutex<HashSet<LocalId>>>, local_id: &LocalId) -> Option<Self> {
        let mut guard = set.lock().unwrap_or_else(|e| e.into_inner());
        if !guard.insert(local_id.clone()) {
            return None;
        }
        Some(InFlight {
            set: Arc::clone(set),
            local_id: local_id.clone(),
        })
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let mut guard = self.set.lock().unwrap_or_else(|e| e.into_inner());
        guard.remove(&self.local_id);
    }
}

/// Clears the draining flag when a run ends, however it ends.
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct SyncCoordinator {
    outbox: Arc<Outbox>,
    remote: Arc<dyn RemoteSubmitter>,
    online: watch::Receiver<bool>,
    concurrency: usize,
    submit_timeout: Duration,
    draining: AtomicBool,
    coalesced: AtomicBool,
    in_flight: Arc<Mutex<HashSet<LocalId>>>,
    triggers: mpsc::Sender<Trigger>,
    reports: broadcast::Sender<RunReport>,
    health: watch::Sender<EngineHealth>,
    cancel: CancellationToken,
}

impl SyncCoordinator {
    /// Create a coordinator.
    ///
    /// Returns the coordinator and the trigger receiver to hand to
    /// [`SyncCoordinator::run_loop`]. `online` is the debounced connectivity state.
    pub fn new(
        outbox: Arc<Outbox>,
        remote: Arc<dyn RemoteSubmitter>,
        online: watch::Receiver<bool>,
        concurrency: usize,
        submit_timeout: Duration,
    ) -> (Arc<Self>, mpsc::Receiver<Trigger>) {
        // One queued trigger is enough: every run re-reads the outbox.
        let (triggers, trigger_rx) = mpsc::channel(1);
        let (reports, _) = broadcast::channel(16);
        let (health, _) = watch::channel(EngineHealth::Running);

        let coordinator = Arc::new(SyncCoordinator {
            outbox,
            remote,
            online,
            concurrency: concurrency.max(1),
            submit_timeout,
            draining: AtomicBool::new(false),
            coalesced: AtomicBool::new(false),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            triggers,
            reports,
            health,
            cancel: CancellationToken::new(),
        });
        (coordinator, trigger_rx)
    }

    pub fn outbox(&self) -> &Arc<Outbox> {
        &self.outbox
    }

    pub fn is_online(&self) -> bool {
        *self.online.borrow()
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    pub fn health(&self) -> EngineHealth {
        self.health.borrow().clone()
    }

    pub fn watch_health(&self) -> watch::Receiver<EngineHealth> {
        self.health.subscribe()
    }

    /// Reports of runs completed by the loop.
    pub fn subscribe_reports(&self) -> broadcast::Receiver<RunReport> {
        self.reports.subscribe()
    }

    /// Stop at the next record boundary. In-flight submissions finish on
    /// their own schedule.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Ask the loop for a run. Never blocks.
    pub fn request(&self, trigger: Trigger) -> TriggerOutcome {
        if self.cancel.is_cancelled() {
            return TriggerOutcome::Stopped;
        }
        if self.is_draining() {
            self.coalesced.store(true, Ordering::Release);
            debug!("Coalesced {:?} into the running drain", trigger);
            return TriggerOutcome::Coalesced;
        }
        match self.triggers.try_send(trigger) {
            Ok(()) => TriggerOutcome::Scheduled,
            Err(mpsc::error::TrySendError::Full(_)) => TriggerOutcome::Coalesced,
            Err(mpsc::error::TrySendError::Closed(_)) => TriggerOutcome::Stopped,
        }
    }

    /// Perform one run now, unless one is already draining.
    pub async fn run_once(&self) -> Result<RunOutcome> {
        if self
            .draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(RunOutcome::AlreadyDraining);
        }
        let _guard = DrainGuard(&self.draining);
        let report = self.drain().await?;
        Ok(RunOutcome::Completed(report))
    }

    async fn drain(&self) -> Result<RunReport> {
        let mut report = RunReport::default();
        let mut online = self.online.clone();

        if self.cancel.is_cancelled() {
            report.aborted = Some(AbortReason::Cancelled);
            return Ok(report);
        }
        if !*online.borrow_and_update() {
            debug!("Offline, skipping sync run");
            report.aborted = Some(AbortReason::Offline);
            return Ok(report);
        }

        let snapshot = self.outbox.eligible_for_sync()?;
        if snapshot.is_empty() {
            return Ok(report);
        }
        info!("Sync run started with {} eligible reports", snapshot.len());

        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks: JoinSet<kb_core::Result<Settled>> = JoinSet::new();
        let mut fatal: Option<kb_core::Error> = None;

        for record in snapshot {
            while let Some(done) = tasks.try_join_next() {
                absorb(done, &mut report, &mut fatal);
            }
            if fatal.is_some() {
                break;
            }
            if self.cancel.is_cancelled() {
                report.aborted = Some(AbortReason::Cancelled);
                break;
            }
            if !*online.borrow_and_update() {
                report.aborted = Some(AbortReason::ConnectivityLost);
                break;
            }

            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    report.aborted = Some(AbortReason::Cancelled);
                    break;
                }
                _ = went_offline(&mut online) => {
                    report.aborted = Some(AbortReason::ConnectivityLost);
                    break;
                }
                permit = Arc::clone(&permits).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let Some(claim) = InFlight::claim(&self.in_flight, &record.local_id) else {
                warn!("{} already in flight, skipping", record.local_id);
                report.skipped += 1;
                continue;
            };

            match self.outbox.mark_syncing(&record.local_id) {
                Ok(()) => {}
                Err(e) if e.is_storage() => {
                    error!("Local store failed while marking {}: {}", record.local_id, e);
                    fatal = Some(e);
                    break;
                }
                Err(e) => {
                    warn!("Skipping {}: {}", record.local_id, e);
                    report.skipped += 1;
                    continue;
                }
            }
            report.attempted += 1;

            let outbox = Arc::clone(&self.outbox);
            let remote = Arc::clone(&self.remote);
            let timeout = self.submit_timeout;
            tasks.spawn(async move {
                let _permit = permit;
                let _claim = claim;
                let outcome =
                    match tokio::time::timeout(timeout, remote.submit(&record.local_id, &record.payload))
                        .await
                    {
                        Ok(outcome) => outcome,
                        Err(_) => SubmitOutcome::RejectedTransient(format!(
                            "submission timed out after {}s",
                            timeout.as_secs_f64()
                        )),
                    };
                settle(&outbox, &record.local_id, outcome)
            });
        }

        // In-flight submissions are never aborted; wait them out.
        while let Some(done) = tasks.join_next().await {
            absorb(done, &mut report, &mut fatal);
        }

        if let Some(e) = fatal {
            return Err(SyncError::Store(e));
        }

        info!(
            "Sync run finished: {} attempted, {} synced, {} transient, {} permanent, {} skipped{}",
            report.attempted,
            report.synced,
            report.failed_transient,
            report.failed_permanent,
            report.skipped,
            report
                .aborted
                .map(|reason| format!(", aborted ({reason:?})"))
                .unwrap_or_default()
        );
        Ok(report)
    }

    /// Serve triggers until cancelled, the trigger channel closes, or the
    /// local store fails.
    ///
    /// While online, arms a timer for the earliest scheduled retry and runs
    /// when it fires.
    pub async fn run_loop(self: Arc<Self>, mut triggers: mpsc::Receiver<Trigger>) {
        let mut retry_armed = true;

        loop {
            let deadline = if retry_armed && self.is_online() {
                match self.retry_deadline() {
                    Ok(deadline) => deadline,
                    Err(e) => {
                        self.fail(e);
                        return;
                    }
                }
            } else {
                None
            };

            let trigger = tokio::select! {
                _ = self.cancel.cancelled() => break,
                trigger = triggers.recv() => match trigger {
                    Some(trigger) => trigger,
                    None => break,
                },
                _ = sleep_until_opt(deadline) => Trigger::RetryDue,
            };
            debug!("Sync triggered by {:?}", trigger);

            let mut report = match self.run_once().await {
                Ok(RunOutcome::Completed(report)) => report,
                Ok(RunOutcome::AlreadyDraining) => continue,
                Err(e) => {
                    self.fail(e);
                    return;
                }
            };

            // Triggers that arrived mid-run get exactly one follow-up run.
            while report.aborted.is_none() && self.coalesced.swap(false, Ordering::AcqRel) {
                report = match self.run_once().await {
                    Ok(RunOutcome::Completed(report)) => report,
                    Ok(RunOutcome::AlreadyDraining) => break,
                    Err(e) => {
                        self.fail(e);
                        return;
                    }
                };
            }

            // A retry run that found nothing to do must not spin on a past
            // deadline; wait for the next real trigger instead.
            retry_armed = !(trigger == Trigger::RetryDue && report.attempted == 0);
            let _ = self.reports.send(report);
        }

        self.health.send_replace(EngineHealth::Stopped);
        debug!("Sync coordinator loop stopped");
    }

    fn retry_deadline(&self) -> kb_core::Result<Option<Instant>> {
        let Some(at) = self.outbox.next_retry_at()? else {
            return Ok(None);
        };
        let wait = (at - self.outbox.now()).to_std().unwrap_or(Duration::ZERO);
        Ok(Some(Instant::now() + wait))
    }

    fn fail(&self, e: impl Into<SyncError>) {
        let e = e.into();
        error!("Sync coordinator stopped: {}", e);
        self.health
            .send_replace(EngineHealth::StorageFailure(e.to_string()));
        self.cancel.cancel();
    }
}

/// Apply a submission outcome to the record.
fn settle(outbox: &Outbox, local_id: &LocalId, outcome: SubmitOutcome) -> kb_core::Result<Settled> {
    let result = match outcome {
        SubmitOutcome::Accepted(remote_id) => {
            debug!("{} accepted as {}", local_id, remote_id);
            outbox.mark_synced(local_id, remote_id).map(|_| Settled::Synced)
        }
        SubmitOutcome::RejectedPermanent(reason) => {
            warn!("{} rejected permanently: {}", local_id, reason);
            outbox
                .mark_failed(local_id, &reason, FailureKind::Permanent)
                .map(|_| Settled::Permanent)
        }
        SubmitOutcome::RejectedTransient(reason) => {
            debug!("{} rejected transiently: {}", local_id, reason);
            outbox
                .mark_failed(local_id, &reason, FailureKind::Transient)
                .map(|_| Settled::Transient)
        }
    };

    match result {
        Err(e) if e.is_contract_violation() => {
            warn!("Could not settle {}: {}", local_id, e);
            Ok(Settled::Skipped)
        }
        other => other,
    }
}

fn absorb(
    done: std::result::Result<kb_core::Result<Settled>, JoinError>,
    report: &mut RunReport,
    fatal: &mut Option<kb_core::Error>,
) {
    match done {
        Ok(Ok(Settled::Synced)) => report.synced += 1,
        Ok(Ok(Settled::Transient)) => report.failed_transient += 1,
        Ok(Ok(Settled::Permanent)) => report.failed_permanent += 1,
        Ok(Ok(Settled::Skipped)) => report.skipped += 1,
        Ok(Err(e)) => {
            error!("Local store failed while settling a submission: {}", e);
            if fatal.is_none() {
                *fatal = Some(e);
            }
        }
        // The record stays `Syncing` until the next startup sweep.
        Err(e) => error!("Submission task failed: {}", e),
    }
}

/// Resolves once the debounced state reads offline. Never resolves if the
/// state source is gone.
async fn went_offline(online: &mut watch::Receiver<bool>) {
    if online.wait_for(|up| !*up).await.is_err() {
        std::future::pending::<()>().await;
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
