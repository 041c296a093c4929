// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Inbound event dispatch.
//!
//! Listener registry keyed by event kind, plus wildcard listeners that
//! receive every envelope. Exact-kind listeners run first, in registration
//! order, then wildcard listeners. A failing listener is logged and never
//! prevents the others from running.

use std::collections::HashMap;

use till_core::Envelope;

/// Error type listeners may return; failures are logged and isolated.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// Consumer callback invoked with each matching envelope.
pub type Listener = Box<dyn Fn(&Envelope) -> Result<(), ListenerError> + Send>;

/// Identity of a registered listener, used for removal.
///
/// Callbacks are not comparable, so the registry mints an id per
/// registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Registry of per-kind and wildcard listeners.
pub struct InboundDispatcher {
    listeners: HashMap<String, Vec<(ListenerId, Listener)>>,
    wildcard: Vec<(ListenerId, Listener)>,
    next_id: u64,
}

impl InboundDispatcher {
    /// Create an empty registry.
    pub fn new() -> Self {
        InboundDispatcher {
            listeners: HashMap::new(),
            wildcard: Vec::new(),
            next_id: 0,
        }
    }

    fn mint(&mut self) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Register a listener for an exact event kind.
    pub fn add_listener(&mut self, kind: &str, listener: Listener) -> ListenerId {
        let id = self.mint();
        self.listeners
            .entry(kind.to_string())
            .or_default()
            .push((id, listener));
        id
    }

    /// Register a listener receiving every dispatched envelope.
    pub fn add_wildcard_listener(&mut self, listener: Listener) -> ListenerId {
        let id = self.mint();
        self.wildcard.push((id, listener));
        id
    }

    /// Remove a per-kind listener. Returns true if it was registered.
    pub fn remove_listener(&mut self, kind: &str, id: ListenerId) -> bool {
        let Some(listeners) = self.listeners.get_mut(kind) else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|(registered, _)| *registered != id);
        let removed = listeners.len() < before;
        if listeners.is_empty() {
            self.listeners.remove(kind);
        }
        removed
    }

    /// Remove a wildcard listener. Returns true if it was registered.
    pub fn remove_wildcard_listener(&mut self, id: ListenerId) -> bool {
        let before = self.wildcard.len();
        self.wildcard.retain(|(registered, _)| *registered != id);
        self.wildcard.len() < before
    }

    /// Number of listeners that would see an envelope of `kind`.
    pub fn listener_count(&self, kind: &str) -> usize {
        let exact = self.listeners.get(kind).map_or(0, Vec::len);
        exact + self.wildcard.len()
    }

    /// Fan an envelope out to its listeners.
    ///
    /// Returns the number of listeners invoked.
    pub fn dispatch(&self, envelope: &Envelope) -> usize {
        let mut invoked = 0;

        if let Some(listeners) = self.listeners.get(&envelope.kind) {
            for (id, listener) in listeners {
                invoked += 1;
                if let Err(e) = listener(envelope) {
                    tracing::warn!("listener {:?} failed for kind {}: {}", id, envelope.kind, e);
                }
            }
        }

        for (id, listener) in &self.wildcard {
            invoked += 1;
            if let Err(e) = listener(envelope) {
                tracing::warn!("wildcard listener {:?} failed: {}", id, e);
            }
        }

        invoked
    }
}

impl Default for InboundDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
