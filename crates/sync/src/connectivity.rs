// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connectivity monitor.
//!
//! Debounces a raw reachability flag into stable online/offline state and
//! edge-triggered [`ConnectivityEvent`]s. The raw flag is read once when the
//! monitor starts; that initial value never produces an event.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::stream::Stream;
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use kb_core::ClockSource;

use crate::status::broadcast_stream;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectivityKind {
    GainedConnectivity,
    LostConnectivity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectivityEvent {
    pub kind: ConnectivityKind,
    pub at: DateTime<Utc>,
}

/// Handle to a running debounce task.
pub struct ConnectivityMonitor {
    stable: watch::Receiver<bool>,
    events: broadcast::Sender<ConnectivityEvent>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ConnectivityMonitor {
    /// Start debouncing `raw`.
    ///
    /// A change in `raw` only counts once `raw` has held still for `debounce`.
    /// Flapping inside the window collapses into at most one event, and none
    /// at all if it settles back where it started.
    pub fn spawn(
        mut raw: watch::Receiver<bool>,
        debounce: Duration,
        clock: Arc<dyn ClockSource>,
        buffer: usize,
    ) -> Self {
        let initial = *raw.borrow_and_update();
        let (stable_tx, stable) = watch::channel(initial);
        let (events, _) = broadcast::channel(buffer.max(1));
        let cancel = CancellationToken::new();

        let task = tokio::spawn(debounce_loop(
            raw,
            debounce,
            clock,
            stable_tx,
            events.clone(),
            cancel.clone(),
        ));

        ConnectivityMonitor {
            stable,
            events,
            cancel,
            task: Some(task),
        }
    }

    /// Current debounced state.
    pub fn is_online(&self) -> bool {
        *self.stable.borrow()
    }

    /// A receiver tracking the debounced state.
    pub fn watch(&self) -> watch::Receiver<bool> {
        self.stable.clone()
    }

    /// Subscribe to transition events from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectivityEvent> {
        self.events.subscribe()
    }

    /// A fresh stream of transition events from now on. Each call starts a
    /// new subscription; the stream ends once the monitor stops.
    pub fn events(&self) -> impl Stream<Item = ConnectivityEvent> + Send + Unpin {
        broadcast_stream(self.events.subscribe())
    }

    /// Stop the debounce task and wait for it to exit.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for ConnectivityMonitor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn debounce_loop(
    mut raw: watch::Receiver<bool>,
    debounce: Duration,
    clock: Arc<dyn ClockSource>,
    stable_tx: watch::Sender<bool>,
    events: broadcast::Sender<ConnectivityEvent>,
    cancel: CancellationToken,
) {
    let mut stable = *stable_tx.borrow();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            changed = raw.changed() => {
                if changed.is_err() {
                    debug!("Reachability source closed");
                    return;
                }
            }
        }

        // Wait for the flag to hold still for a full window.
        loop {
            let candidate = *raw.borrow_and_update();
            tokio::select! {
                _ = cancel.cancelled() => return,
                changed = raw.changed() => {
                    if changed.is_err() {
                        settle(candidate, &mut stable, &stable_tx, &events, clock.as_ref());
                        return;
                    }
                }
                _ = tokio::time::sleep(debounce) => {
                    settle(candidate, &mut stable, &stable_tx, &events, clock.as_ref());
                    break;
                }
            }
        }
    }
}

fn settle(
    candidate: bool,
    stable: &mut bool,
    stable_tx: &watch::Sender<bool>,
    events: &broadcast::Sender<ConnectivityEvent>,
    clock: &dyn ClockSource,
) {
    if candidate == *stable {
        return;
    }
    *stable = candidate;
    stable_tx.send_replace(candidate);

    let kind = if candidate {
        ConnectivityKind::GainedConnectivity
    } else {
        ConnectivityKind::LostConnectivity
    };
    info!("Connectivity changed: {:?}", kind);
    // No subscribers is fine; the stable watch still carries the state.
    let _ = events.send(ConnectivityEvent {
        kind,
        at: clock.now(),
    });
}

#[cfg(test)]
#[path = "connectivity_tests.rs"]
mod tests;
