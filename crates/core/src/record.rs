// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Durable message records handed to the message-log collaborator.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::envelope::Envelope;

/// A message as persisted in the local message log.
///
/// New records are always unread; `id` is assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageRecord {
    /// Store-assigned row id, `None` before insertion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// Event kind the record was derived from.
    pub message_type: String,

    /// Display content. For gated kinds this is the human-readable summary
    /// written by the persistence gate.
    pub content: String,

    /// Whether the user has read the message.
    pub read: bool,

    /// Envelope timestamp in milliseconds since the epoch.
    pub created_at: i64,
}

impl MessageRecord {
    /// Builds an unread record from an inbound envelope.
    ///
    /// String payloads are stored verbatim; anything else is stored as its
    /// JSON encoding.
    pub fn from_envelope(envelope: &Envelope) -> Self {
        let content = match &envelope.payload {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        MessageRecord {
            id: None,
            message_type: envelope.kind.clone(),
            content,
            read: false,
            created_at: envelope.timestamp,
        }
    }
}
