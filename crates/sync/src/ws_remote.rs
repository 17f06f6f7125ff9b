// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Remote Submission Interface over WebSocket.
//!
//! Each submission checks a connection out of a small idle pool, sends one
//! `submit` and waits for the `accepted`/`rejected` reply carrying the same
//! local id. Healthy connections go back to the pool; broken ones are
//! dropped. Every transport failure is reported as a transient rejection.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use kb_core::protocol::{ClientMessage, ServerMessage};
use kb_core::{LocalId, ReportPayload};

use crate::remote::{RemoteSubmitter, SubmitOutcome};
use crate::transport::{Transport, TransportError, TransportResult, WebSocketTransport};

/// Creates fresh, unconnected transports.
pub type TransportFactory = Arc<dyn Fn() -> Box<dyn Transport> + Send + Sync>;

/// WebSocket-backed [`RemoteSubmitter`].
pub struct WsRemote {
    url: String,
    factory: TransportFactory,
    idle: Mutex<Vec<Box<dyn Transport>>>,
    max_idle: usize,
}

impl WsRemote {
    /// Create a remote that dials `url` with real WebSocket connections.
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_factory(
            url,
            Arc::new(|| Box::new(WebSocketTransport::new()) as Box<dyn Transport>),
        )
    }

    /// Create a remote with a custom transport factory (for testing).
    pub fn with_factory(url: impl Into<String>, factory: TransportFactory) -> Self {
        WsRemote {
            url: url.into(),
            factory,
            idle: Mutex::new(Vec::new()),
            max_idle: 3,
        }
    }

    /// Keep at most `max_idle` connections open between submissions.
    pub fn with_max_idle(mut self, max_idle: usize) -> Self {
        self.max_idle = max_idle;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Number of pooled idle connections.
    pub fn idle_connections(&self) -> usize {
        self.idle.lock().map(|idle| idle.len()).unwrap_or(0)
    }

    fn checkout(&self) -> Option<Box<dyn Transport>> {
        let mut idle = self.idle.lock().ok()?;
        while let Some(transport) = idle.pop() {
            if transport.is_connected() {
                return Some(transport);
            }
        }
        None
    }

    fn checkin(&self, transport: Box<dyn Transport>) {
        if !transport.is_connected() {
            return;
        }
        if let Ok(mut idle) = self.idle.lock() {
            if idle.len() < self.max_idle {
                idle.push(transport);
            }
        }
    }

    async fn connect_fresh(&self) -> TransportResult<Box<dyn Transport>> {
        let mut transport = (self.factory)();
        transport.connect(&self.url).await?;
        Ok(transport)
    }

    /// One request/response exchange. The transport is returned to the pool
    /// only when the server answered with a correlated reply.
    async fn exchange(
        &self,
        mut transport: Box<dyn Transport>,
        local_id: &LocalId,
        payload: &ReportPayload,
    ) -> TransportResult<SubmitOutcome> {
        transport
            .send(ClientMessage::submit(local_id.clone(), payload.clone()))
            .await?;

        loop {
            let reply = transport
                .recv()
                .await?
                .ok_or(TransportError::ConnectionClosed)?;

            match reply {
                ServerMessage::Accepted {
                    local_id: id,
                    remote_id,
                } if &id == local_id => {
                    self.checkin(transport);
                    return Ok(SubmitOutcome::Accepted(remote_id));
                }
                ServerMessage::Rejected {
                    local_id: id,
                    reason,
                    permanent,
                } if &id == local_id => {
                    self.checkin(transport);
                    return Ok(if permanent {
                        SubmitOutcome::RejectedPermanent(reason)
                    } else {
                        SubmitOutcome::RejectedTransient(reason)
                    });
                }
                ServerMessage::Error { message } => {
                    // Connection state is unknown after a protocol error; drop it.
                    return Ok(SubmitOutcome::RejectedTransient(format!(
                        "server error: {message}"
                    )));
                }
                other => {
                    debug!("Ignoring uncorrelated reply for {}: {:?}", local_id, other);
                }
            }
        }
    }

    async fn submit_inner(&self, local_id: &LocalId, payload: &ReportPayload) -> SubmitOutcome {
        // A pooled connection may have gone stale while idle. Retry once on a
        // fresh one; the server deduplicates on local id.
        if let Some(transport) = self.checkout() {
            match self.exchange(transport, local_id, payload).await {
                Ok(outcome) => return outcome,
                Err(e) => debug!("Pooled connection failed for {}: {}", local_id, e),
            }
        }

        let result = match self.connect_fresh().await {
            Ok(transport) => self.exchange(transport, local_id, payload).await,
            Err(e) => Err(e),
        };

        result.unwrap_or_else(|e| {
            warn!("Submission of {} failed: {}", local_id, e);
            SubmitOutcome::RejectedTransient(e.to_string())
        })
    }
}

impl RemoteSubmitter for WsRemote {
    fn submit<'a>(
        &'a self,
        local_id: &'a LocalId,
        payload: &'a ReportPayload,
    ) -> Pin<Box<dyn Future<Output = SubmitOutcome> + Send + 'a>> {
        Box::pin(self.submit_inner(local_id, payload))
    }
}

#[cfg(test)]
#[path = "ws_remote_tests.rs"]
mod tests;
