// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Test doubles shared by the sync engine's unit tests.

#![allow(clippy::unwrap_used)]
#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use kb_core::protocol::{ClientMessage, ServerMessage};
use kb_core::{ClockSource, Coordinates, LocalId, RemoteId, ReportPayload};

use crate::remote::{RemoteSubmitter, SubmitOutcome};
use crate::transport::{Transport, TransportError, TransportResult};

/// Mock clock for testing with controllable time.
pub struct MockClock {
    time_ms: AtomicU64,
}

impl MockClock {
    pub fn new(initial_ms: u64) -> Arc<Self> {
        Arc::new(MockClock {
            time_ms: AtomicU64::new(initial_ms),
        })
    }

    pub fn advance(&self, by: Duration) {
        self.time_ms
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl ClockSource for MockClock {
    fn now_ms(&self) -> u64 {
        self.time_ms.load(Ordering::SeqCst)
    }
}

pub fn lid(raw: &str) -> LocalId {
    LocalId::new(raw).unwrap()
}

pub fn payload(title: &str) -> ReportPayload {
    ReportPayload::new(title, "roads", Coordinates::new(12.97, 77.59))
}

/// Scriptable Remote Submission Interface.
///
/// Unscripted submissions are accepted with remote id `rpt-{local_id}`.
/// Tracks concurrency so tests can assert at most one in-flight submission
/// per local id.
#[derive(Default)]
pub struct MockRemote {
    script: Mutex<HashMap<LocalId, VecDeque<SubmitOutcome>>>,
    delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<LocalId>>,
    in_flight: Mutex<HashSet<LocalId>>,
    current: AtomicUsize,
    max_concurrent: AtomicUsize,
    duplicate_in_flight: AtomicBool,
}

impl MockRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(MockRemote::default())
    }

    /// Queue outcomes for a local id, consumed one per submission.
    pub fn script(&self, local_id: &LocalId, outcomes: impl IntoIterator<Item = SubmitOutcome>) {
        self.script
            .lock()
            .unwrap()
            .entry(local_id.clone())
            .or_default()
            .extend(outcomes);
    }

    /// Make every submission take `delay`.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> Vec<LocalId> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, local_id: &LocalId) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|id| *id == local_id)
            .count()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent.load(Ordering::SeqCst)
    }

    pub fn saw_duplicate_in_flight(&self) -> bool {
        self.duplicate_in_flight.load(Ordering::SeqCst)
    }
}

impl RemoteSubmitter for MockRemote {
    fn submit<'a>(
        &'a self,
        local_id: &'a LocalId,
        _payload: &'a ReportPayload,
    ) -> Pin<Box<dyn Future<Output = SubmitOutcome> + Send + 'a>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(local_id.clone());
            if !self.in_flight.lock().unwrap().insert(local_id.clone()) {
                self.duplicate_in_flight.store(true, Ordering::SeqCst);
            }
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_concurrent.fetch_max(now, Ordering::SeqCst);

            let delay = *self.delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let scripted = self
                .script
                .lock()
                .unwrap()
                .get_mut(local_id)
                .and_then(|q| q.pop_front());

            self.current.fetch_sub(1, Ordering::SeqCst);
            self.in_flight.lock().unwrap().remove(local_id);

            scripted.unwrap_or_else(|| {
                SubmitOutcome::Accepted(RemoteId::new(format!("rpt-{local_id}")))
            })
        })
    }
}

type Responder = Box<dyn FnMut(&ClientMessage) -> Option<ServerMessage> + Send>;

/// State shared by every [`MockTransport`] a test factory hands out.
pub struct MockHub {
    connects: AtomicUsize,
    fail_connects: AtomicBool,
    outgoing: Mutex<Vec<ClientMessage>>,
    responder: Mutex<Responder>,
}

impl MockHub {
    /// A hub whose transports answer every submit with `accepted`.
    pub fn accepting() -> Arc<Self> {
        Self::with_responder(|msg| match msg {
            ClientMessage::Submit { local_id, .. } => Some(ServerMessage::accepted(
                local_id.clone(),
                RemoteId::new(format!("rpt-{local_id}")),
            )),
            ClientMessage::Ping { id } => Some(ServerMessage::pong(*id)),
        })
    }

    /// A hub whose transports answer with `responder`; `None` closes the connection.
    pub fn with_responder(
        responder: impl FnMut(&ClientMessage) -> Option<ServerMessage> + Send + 'static,
    ) -> Arc<Self> {
        Arc::new(MockHub {
            connects: AtomicUsize::new(0),
            fail_connects: AtomicBool::new(false),
            outgoing: Mutex::new(Vec::new()),
            responder: Mutex::new(Box::new(responder)),
        })
    }

    pub fn set_connect_fail(&self, fail: bool) {
        self.fail_connects.store(fail, Ordering::SeqCst);
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn outgoing(&self) -> Vec<ClientMessage> {
        self.outgoing.lock().unwrap().clone()
    }

    pub fn transport(self: &Arc<Self>) -> MockTransport {
        MockTransport {
            hub: Arc::clone(self),
            connected: false,
            incoming: VecDeque::new(),
        }
    }
}

/// Mock transport for testing without real sockets.
pub struct MockTransport {
    hub: Arc<MockHub>,
    connected: bool,
    incoming: VecDeque<ServerMessage>,
}

impl MockTransport {
    /// Add a message that will be returned by recv() before any reply.
    pub fn queue_incoming(&mut self, msg: ServerMessage) {
        self.incoming.push_back(msg);
    }
}

impl Transport for MockTransport {
    fn connect(
        &mut self,
        _url: &str,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        Box::pin(async move {
            self.hub.connects.fetch_add(1, Ordering::SeqCst);
            if self.hub.fail_connects.load(Ordering::SeqCst) {
                Err(TransportError::ConnectionFailed("mock failure".into()))
            } else {
                self.connected = true;
                Ok(())
            }
        })
    }

    fn disconnect(&mut self) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        Box::pin(async move {
            self.connected = false;
            Ok(())
        })
    }

    fn send(
        &mut self,
        msg: ClientMessage,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        Box::pin(async move {
            if !self.connected {
                return Err(TransportError::ConnectionClosed);
            }
            let reply = {
                let mut responder = self.hub.responder.lock().unwrap();
                (*responder)(&msg)
            };
            self.hub.outgoing.lock().unwrap().push(msg);
            match reply {
                Some(reply) => self.incoming.push_back(reply),
                None => self.connected = false,
            }
            Ok(())
        })
    }

    fn recv(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = TransportResult<Option<ServerMessage>>> + Send + '_>> {
        Box::pin(async move {
            let msg = self.incoming.pop_front();
            if msg.is_none() {
                self.connected = false;
            }
            Ok(msg)
        })
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
