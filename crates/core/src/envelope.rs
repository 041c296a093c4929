// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Wire envelope for the real-time event feed.
//!
//! Every frame exchanged with the event server is a JSON envelope carrying
//! an event kind, an opaque payload, and a millisecond timestamp.
//! Server-pushed envelopes may additionally carry a monotonically increasing
//! sequence `id`.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::kind;

/// The unit of message exchange with the event server.
///
/// On the wire the kind is spelled `type` and the payload `data`; older
/// server builds spell the payload `content`, which is accepted on decode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    /// Event kind (open-world string, see [`crate::kind`]).
    #[serde(rename = "type")]
    pub kind: String,

    /// Opaque payload. Depending on the event kind this is an inline JSON
    /// value or a JSON string containing encoded JSON.
    #[serde(rename = "data", alias = "content", default)]
    pub payload: Value,

    /// Producer timestamp in milliseconds since the epoch.
    #[serde(default)]
    pub timestamp: i64,

    /// Server-assigned sequence id, present on server-pushed envelopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
}

impl Envelope {
    /// Creates an envelope stamped with the current wall clock.
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Envelope {
            kind: kind.into(),
            payload,
            timestamp: now_ms(),
            id: None,
        }
    }

    /// Creates a heartbeat probe envelope.
    pub fn ping() -> Self {
        Envelope::new(kind::PING, Value::Null)
    }

    /// Creates a heartbeat reply envelope.
    pub fn pong() -> Self {
        Envelope::new(kind::PONG, Value::Null)
    }

    /// Returns true if this envelope is a heartbeat reply.
    pub fn is_heartbeat_reply(&self) -> bool {
        kind::is_heartbeat_reply(&self.kind)
    }

    /// Returns true if this envelope is a heartbeat probe.
    pub fn is_heartbeat_probe(&self) -> bool {
        kind::is_heartbeat_probe(&self.kind)
    }

    /// Serializes the envelope to its wire JSON form.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes an envelope from a raw text frame.
    ///
    /// Envelopes without a kind are rejected; the dispatcher has nowhere to
    /// route them.
    pub fn decode(frame: &str) -> Result<Self> {
        let envelope: Envelope = serde_json::from_str(frame)?;
        if envelope.kind.is_empty() {
            return Err(Error::EmptyKind);
        }
        Ok(envelope)
    }
}

/// Current wall clock in milliseconds since the epoch.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
