// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket protocol messages between a device and the submission server.
//!
//! The protocol is request/response:
//! - Client sends one `submit` per report, keyed by its local id
//! - Server answers with `accepted` or `rejected` for that local id
//!
//! Resubmitting an accepted local id must yield the same remote id.

use serde::{Deserialize, Serialize};

use crate::id::{LocalId, RemoteId};
use crate::report::ReportPayload;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Submit a report for acceptance.
    Submit {
        local_id: LocalId,
        payload: ReportPayload,
    },

    /// Ping message for keepalive.
    Ping {
        /// Client-chosen ID echoed in Pong.
        id: u64,
    },
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The report is stored remotely under `remote_id`.
    Accepted {
        local_id: LocalId,
        remote_id: RemoteId,
    },

    /// The report was not stored.
    Rejected {
        local_id: LocalId,
        reason: String,
        /// True when resubmitting the same payload can never succeed.
        permanent: bool,
    },

    /// Pong response to client Ping.
    Pong {
        /// Echoed from the Ping message.
        id: u64,
    },

    /// Error not tied to a specific report (e.g. unparseable request).
    Error {
        /// Human-readable error description.
        message: String,
    },
}

impl ClientMessage {
    /// Creates a Submit message.
    pub fn submit(local_id: LocalId, payload: ReportPayload) -> Self {
        ClientMessage::Submit { local_id, payload }
    }

    /// Creates a Ping message.
    pub fn ping(id: u64) -> Self {
        ClientMessage::Ping { id }
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Creates an Accepted message.
    pub fn accepted(local_id: LocalId, remote_id: RemoteId) -> Self {
        ServerMessage::Accepted {
            local_id,
            remote_id,
        }
    }

    /// Creates a permanent rejection.
    pub fn rejected_permanent(local_id: LocalId, reason: impl Into<String>) -> Self {
        ServerMessage::Rejected {
            local_id,
            reason: reason.into(),
            permanent: true,
        }
    }

    /// Creates a transient rejection.
    pub fn rejected_transient(local_id: LocalId, reason: impl Into<String>) -> Self {
        ServerMessage::Rejected {
            local_id,
            reason: reason.into(),
            permanent: false,
        }
    }

    /// Creates a Pong message.
    pub fn pong(id: u64) -> Self {
        ServerMessage::Pong { id }
    }

    /// Creates an Error message.
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    /// The local id this message answers, if any.
    pub fn local_id(&self) -> Option<&LocalId> {
        match self {
            ServerMessage::Accepted { local_id, .. } | ServerMessage::Rejected { local_id, .. } => {
                Some(local_id)
            }
            ServerMessage::Pong { .. } | ServerMessage::Error { .. } => None,
        }
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
