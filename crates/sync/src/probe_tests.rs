// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::net::TcpListener;
use yare::parameterized;

#[parameterized(
    ws_default_port = { "ws://reports.example.org", "reports.example.org:80" },
    wss_default_port = { "wss://reports.example.org/submit", "reports.example.org:443" },
    explicit_port = { "ws://127.0.0.1:7890", "127.0.0.1:7890" },
    path_and_query = { "ws://host:9000/api?v=1", "host:9000" },
    userinfo = { "wss://user@host", "host:443" },
    ipv6 = { "ws://[::1]:7890/", "[::1]:7890" },
    ipv6_default = { "ws://[::1]", "[::1]:80" },
    empty_port = { "ws://host:/submit", "host:80" },
    default_port_spelled_out = { "wss://host:443", "host:443" },
)]
fn probe_address_from_url(url: &str, expected: &str) {
    let probe = TcpProbe::from_url(url, Duration::from_secs(1)).unwrap();
    assert_eq!(probe.addr(), expected);
}

#[parameterized(
    ftp = { "ftp://host" },
    no_scheme = { "host:80" },
    empty_host = { "ws://" },
    bad_port = { "ws://host:99999" },
)]
fn probe_rejects_bad_urls(url: &str) {
    assert!(TcpProbe::from_url(url, Duration::from_secs(1)).is_none());
}

#[tokio::test]
async fn tcp_probe_sees_listener() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let probe = TcpProbe::new(addr.to_string(), Duration::from_secs(2));

    assert!(probe.probe().await);

    drop(listener);
    assert!(!probe.probe().await);
}

/// Probe that replays a fixed script, repeating the last answer.
struct ScriptedProbe {
    answers: Mutex<VecDeque<bool>>,
}

impl ScriptedProbe {
    fn new(answers: &[bool]) -> Self {
        ScriptedProbe {
            answers: Mutex::new(answers.iter().copied().collect()),
        }
    }
}

impl ReachabilityProbe for ScriptedProbe {
    fn probe(&self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
        let mut answers = self.answers.lock().unwrap();
        let answer = if answers.len() > 1 {
            answers.pop_front().unwrap()
        } else {
            *answers.front().unwrap()
        };
        Box::pin(async move { answer })
    }
}

#[tokio::test(start_paused = true)]
async fn poll_publishes_only_changes() {
    let probe = ScriptedProbe::new(&[false, false, true, true, false]);
    let cancel = CancellationToken::new();
    let (mut rx, handle) = poll_reachability(probe, Duration::from_secs(1), cancel.clone()).await;

    assert!(!*rx.borrow_and_update());

    rx.changed().await.unwrap();
    assert!(*rx.borrow_and_update());

    rx.changed().await.unwrap();
    assert!(!*rx.borrow_and_update());

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn poll_stops_when_receivers_drop() {
    let probe = ScriptedProbe::new(&[true]);
    let (rx, handle) =
        poll_reachability(probe, Duration::from_secs(1), CancellationToken::new()).await;

    drop(rx);
    handle.await.unwrap();
}
