// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Collaborator interfaces consumed by the feed.
//!
//! The supervisor touches application state only through these narrow
//! traits; the embedding application injects concrete implementations at
//! construction time. No ambient global lookup.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use till_core::MessageRecord;

/// Error type collaborators may return; the gate logs and continues.
pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// Boxed future returned by async collaborator calls.
pub type SinkFuture<'a> = Pin<Box<dyn Future<Output = Result<(), SinkError>> + Send + 'a>>;

/// Supplies the identity and credential used to build the connection URL.
pub trait CredentialProvider: Send + Sync {
    /// Current auth token, or `None` when logged out.
    fn credential(&self) -> Option<String>;

    /// Stable identity of the signed-in operator.
    fn identity(&self) -> String;
}

/// Applies authoritative server-side state changes to local storage.
pub trait MutationSink: Send + Sync {
    /// Mirror a server-side order into local storage.
    fn apply_order(&self, payload: Value) -> SinkFuture<'_>;

    /// Mirror a server-side registration into local storage.
    fn apply_user(&self, payload: Value) -> SinkFuture<'_>;
}

/// Durable log for inbound messages that must survive the session.
pub trait MessageStore: Send + Sync {
    /// Append a record to the message log.
    fn persist(&self, record: MessageRecord) -> SinkFuture<'_>;
}

/// Surfaces session-fatal conditions to the user.
pub trait FatalNotifier: Send + Sync {
    /// Report a condition that requires external action (manual reconnect
    /// or application reload).
    fn notify_fatal(&self, message: &str);
}

/// Injected collaborator set for a feed instance.
#[derive(Clone)]
pub struct Collaborators {
    /// Identity and credential source.
    pub credentials: Arc<dyn CredentialProvider>,
    /// Business-mutation sink.
    pub mutations: Arc<dyn MutationSink>,
    /// Durable message log.
    pub messages: Arc<dyn MessageStore>,
    /// Fatal-condition notifier.
    pub notifier: Arc<dyn FatalNotifier>,
}
