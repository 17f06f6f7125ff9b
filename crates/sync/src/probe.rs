// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Poll-style reachability sources.
//!
//! A probe answers "can I reach the remote right now?". [`poll_reachability`]
//! turns a probe into the raw flag the connectivity monitor debounces.
//! Push-style platforms skip this and write a `watch` channel directly.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

/// A single reachability check.
pub trait ReachabilityProbe: Send + Sync {
    fn probe(&self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>>;
}

/// Reachable means a TCP connect to the remote host succeeds in time.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    addr: String,
    timeout: Duration,
}

impl TcpProbe {
    /// Probe `addr` (`host:port`).
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        TcpProbe {
            addr: addr.into(),
            timeout,
        }
    }

    /// Probe the host of a `ws://` or `wss://` URL, defaulting the port by scheme.
    ///
    /// Returns `None` for other schemes or an empty host.
    pub fn from_url(url: &str, timeout: Duration) -> Option<Self> {
        let url = Url::parse(url).ok()?;
        if !matches!(url.scheme(), "ws" | "wss" | "http" | "https") {
            return None;
        }
        let host = url.host_str().filter(|host| !host.is_empty())?;
        let port = url.port_or_known_default()?;
        Some(TcpProbe::new(format!("{host}:{port}"), timeout))
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

impl ReachabilityProbe for TcpProbe {
    fn probe(&self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
        Box::pin(async move {
            matches!(
                tokio::time::timeout(self.timeout, TcpStream::connect(self.addr.as_str())).await,
                Ok(Ok(_))
            )
        })
    }
}

/// Probe once, then keep probing every `interval` in a background task.
///
/// The returned receiver starts at the first probe's answer and changes only
/// when a later probe disagrees. The task stops on `cancel` or once every
/// receiver is gone.
pub async fn poll_reachability<P>(
    probe: P,
    interval: Duration,
    cancel: CancellationToken,
) -> (watch::Receiver<bool>, JoinHandle<()>)
where
    P: ReachabilityProbe + 'static,
{
    let initial = probe.probe().await;
    let (tx, rx) = watch::channel(initial);

    let handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tx.closed() => break,
                _ = tokio::time::sleep(interval) => {}
            }

            let reachable = probe.probe().await;
            let changed = tx.send_if_modified(|current| {
                if *current == reachable {
                    false
                } else {
                    *current = reachable;
                    true
                }
            });
            if changed {
                debug!("Reachability probe now reports {}", reachable);
            }
        }
    });

    (rx, handle)
}

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;
