// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Allow unused items: test helpers are shared across multiple test binaries,
// and not every test file uses every helper.
#![allow(dead_code)]
#![allow(unused_imports)]

use std::net::TcpListener as StdTcpListener;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use futures_util::{SinkExt, StreamExt};
use kb_core::{ClientMessage, RemoteId, ServerMessage};
use tokio_tungstenite::tungstenite::Message;

pub use predicates::prelude::*;
pub use tempfile::TempDir;

pub fn kerb() -> Command {
    cargo_bin_cmd!("kerb")
}

/// Initialized temp directory with device `tablet7` and no remote.
pub fn init_temp() -> TempDir {
    let temp = TempDir::new().unwrap();
    kerb()
        .args(["init", "--device", "tablet7"])
        .current_dir(temp.path())
        .assert()
        .success();
    temp
}

/// Initialized temp directory pointing at `url`.
pub fn init_temp_with_remote(url: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    kerb()
        .args(["init", "--device", "tablet7", "--remote", url])
        .current_dir(temp.path())
        .assert()
        .success();
    temp
}

/// Capture a report and return its local id.
pub fn create_report(temp: &TempDir, title: &str) -> String {
    let output = kerb()
        .args(["new", title, "-c", "roads", "--lat", "52.52", "--lon", "13.40", "-o", "id"])
        .current_dir(temp.path())
        .output()
        .unwrap();
    assert!(output.status.success(), "kerb new failed: {:?}", output);
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

pub fn status_json(temp: &TempDir) -> serde_json::Value {
    let output = kerb()
        .args(["status", "-o", "json"])
        .current_dir(temp.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).unwrap()
}

pub fn list_json(temp: &TempDir) -> Vec<serde_json::Value> {
    let output = kerb()
        .args(["list", "-o", "json"])
        .current_dir(temp.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).unwrap()
}

/// Minimal submission server on a background thread.
///
/// Accepts every report except those whose title starts with `reject`,
/// which are rejected permanently. Lives until the test process exits.
pub fn spawn_remote() -> String {
    let listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            let seq = Arc::new(AtomicU64::new(0));
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    continue;
                };
                let seq = Arc::clone(&seq);
                tokio::spawn(async move {
                    let Ok(ws) = tokio_tungstenite::accept_async(stream).await else {
                        return;
                    };
                    let (mut sink, mut stream) = ws.split();
                    while let Some(Ok(msg)) = stream.next().await {
                        let Message::Text(text) = msg else {
                            continue;
                        };
                        let reply = match ClientMessage::from_json(text.as_str()) {
                            Ok(ClientMessage::Submit { local_id, payload })
                                if payload.title.starts_with("reject") =>
                            {
                                ServerMessage::rejected_permanent(local_id, "title not allowed")
                            }
                            Ok(ClientMessage::Submit { local_id, .. }) => {
                                let n = seq.fetch_add(1, Ordering::SeqCst) + 1;
                                ServerMessage::accepted(
                                    local_id,
                                    RemoteId::new(format!("rpt-{:06}", n)),
                                )
                            }
                            Ok(ClientMessage::Ping { id }) => ServerMessage::Pong { id },
                            Err(e) => ServerMessage::Error {
                                message: e.to_string(),
                            },
                        };
                        let json = serde_json::to_string(&reply).unwrap();
                        if sink.send(Message::Text(json.into())).await.is_err() {
                            return;
                        }
                    }
                });
            }
        });
    });

    format!("ws://{}", addr)
}
