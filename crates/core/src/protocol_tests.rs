// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::report::Coordinates;
use yare::parameterized;

fn lid() -> LocalId {
    LocalId::new("dev1-1700000000000-0").unwrap()
}

fn payload() -> ReportPayload {
    ReportPayload::new("Pothole on Main St", "roads", Coordinates::new(40.7, -74.0))
        .with_description("Deep enough to lose a wheel")
}

#[test]
fn submit_wire_format() {
    let json = ClientMessage::submit(lid(), payload()).to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["type"], "submit");
    assert_eq!(value["local_id"], "dev1-1700000000000-0");
    assert_eq!(value["payload"]["title"], "Pothole on Main St");
    assert_eq!(value["payload"]["coordinates"]["latitude"], 40.7);
}

#[parameterized(
    accepted = { ServerMessage::accepted(LocalId::new("a-1-0").unwrap(), RemoteId::new("rpt-000001")), "accepted" },
    rejected = { ServerMessage::rejected_permanent(LocalId::new("a-1-0").unwrap(), "bad"), "rejected" },
    pong = { ServerMessage::pong(7), "pong" },
    error = { ServerMessage::error("oops"), "error" },
)]
fn server_message_type_tags(msg: ServerMessage, tag: &str) {
    let value: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
    assert_eq!(value["type"], tag);
    assert_eq!(ServerMessage::from_json(&msg.to_json().unwrap()).unwrap(), msg);
}

#[test]
fn rejection_constructors_set_permanence() {
    let permanent = ServerMessage::rejected_permanent(lid(), "title empty");
    let transient = ServerMessage::rejected_transient(lid(), "db busy");

    assert!(matches!(permanent, ServerMessage::Rejected { permanent: true, .. }));
    assert!(matches!(transient, ServerMessage::Rejected { permanent: false, .. }));
}

#[test]
fn local_id_correlation() {
    assert_eq!(
        ServerMessage::accepted(lid(), RemoteId::new("r")).local_id(),
        Some(&lid())
    );
    assert_eq!(ServerMessage::pong(1).local_id(), None);
    assert_eq!(ServerMessage::error("x").local_id(), None);
}

#[test]
fn submit_with_invalid_local_id_fails_to_parse() {
    let json = r#"{"type":"submit","local_id":"has space","payload":{"title":"t","category":"c","coordinates":{"latitude":0.0,"longitude":0.0}}}"#;
    assert!(ClientMessage::from_json(json).is_err());
}

#[test]
fn unknown_type_fails_to_parse() {
    assert!(ClientMessage::from_json(r#"{"type":"snapshot"}"#).is_err());
    assert!(ServerMessage::from_json("not json").is_err());
}

#[test]
fn ping_parses() {
    assert_eq!(
        ClientMessage::from_json(r#"{"type":"ping","id":42}"#).unwrap(),
        ClientMessage::ping(42)
    );
}
