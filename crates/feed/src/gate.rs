// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Persistence gate for inbound envelopes.
//!
//! Event kinds that represent authoritative server-side state changes
//! trigger, in order: the local business mutation, a display rewrite of the
//! payload, and a durable message-log append. All of it runs before
//! listener fan-out. Collaborator failures are logged and never abort
//! fan-out; the UI is informed even when persistence degraded.

use std::sync::Arc;

use serde_json::Value;
use till_core::{kind, Envelope, MessageRecord, Mutation};

use crate::sinks::{MessageStore, MutationSink};

/// Orchestrates mutation and persistence side-effects for inbound envelopes.
pub struct PersistenceGate {
    mutations: Arc<dyn MutationSink>,
    messages: Arc<dyn MessageStore>,
}

impl PersistenceGate {
    /// Create a gate over the injected collaborators.
    pub fn new(mutations: Arc<dyn MutationSink>, messages: Arc<dyn MessageStore>) -> Self {
        PersistenceGate {
            mutations,
            messages,
        }
    }

    /// Run side-effects for one envelope.
    ///
    /// For mutation-triggering kinds the payload is rewritten to a
    /// human-readable summary before the envelope reaches the message log
    /// and the listeners.
    pub async fn process(&self, envelope: &mut Envelope) {
        if let Some(mutation) = kind::mutation_for(&envelope.kind) {
            self.apply_mutation(envelope, mutation).await;
        }

        if kind::requires_persistence(&envelope.kind) {
            let record = MessageRecord::from_envelope(envelope);
            if let Err(e) = self.messages.persist(record).await {
                tracing::warn!("failed to persist {} message: {}", envelope.kind, e);
            }
        }
    }

    async fn apply_mutation(&self, envelope: &mut Envelope, mutation: Mutation) {
        let payload = match business_payload(&envelope.payload) {
            Ok(payload) => payload,
            Err(e) => {
                // Cannot mutate or summarize; the raw envelope still flows on.
                tracing::warn!("undecodable {} payload: {}", envelope.kind, e);
                return;
            }
        };

        let result = match mutation {
            Mutation::Order => self.mutations.apply_order(payload.clone()).await,
            Mutation::User => self.mutations.apply_user(payload.clone()).await,
        };
        if let Err(e) = result {
            tracing::warn!("{} mutation failed: {}", envelope.kind, e);
        }

        envelope.payload = Value::String(summary(mutation, &payload));
    }
}

/// Decodes the business payload: either an inline value or a JSON string
/// containing encoded JSON.
fn business_payload(payload: &Value) -> Result<Value, serde_json::Error> {
    match payload {
        Value::String(text) => serde_json::from_str(text),
        other => Ok(other.clone()),
    }
}

/// One-line summary written into the display payload.
fn summary(mutation: Mutation, payload: &Value) -> String {
    match mutation {
        Mutation::Order => format!("{} placed an order", nick_name(&payload["order"])),
        Mutation::User => format!("new user {} registered", nick_name(payload)),
    }
}

fn nick_name(value: &Value) -> String {
    value
        .get("nickName")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string()
}
