// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! till-feed: resilient real-time event feed for the till back office.
//!
//! Keeps a single long-lived duplex channel to the event server alive
//! against an unreliable network and fans server-pushed envelopes out to
//! typed consumers.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  FeedHandle │────►│ Supervisor  │────►│  Transport  │
//! │  (commands) │◄────│ (one loop)  │◄────│   (trait)   │
//! └─────────────┘     └──────┬──────┘     └─────────────┘
//!                            │
//!              ┌─────────────┼─────────────┐
//!              ▼             ▼             ▼
//!       ┌───────────┐ ┌────────────┐ ┌───────────┐
//!       │  Outbound │ │ Persistence│ │  Inbound  │
//!       │   Queue   │ │    Gate    │ │ Dispatcher│
//!       └───────────┘ └────────────┘ └───────────┘
//! ```
//!
//! # Features
//!
//! - Automatic reconnect with capped backoff and an attempt limit
//! - Envelope-level heartbeat probes detecting silently dead connections
//! - FIFO queueing of sends attempted while disconnected
//! - Per-kind and wildcard listener fan-out with per-listener isolation
//! - Local mutation and durable logging side-effects for authoritative
//!   server events, orchestrated before fan-out
//! - Injectable transport trait with a plain WebSocket binding and a
//!   host-bridged binding

pub mod backoff;
pub mod bridge;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod gate;
pub mod queue;
pub mod sinks;
pub mod state;
pub mod supervisor;
pub mod transport;

pub use backoff::ReconnectPolicy;
pub use bridge::{bridge_pair, BridgeEvent, BridgeHost, BridgeRequest, BridgedTransport};
pub use config::FeedConfig;
pub use dispatch::{InboundDispatcher, Listener, ListenerError, ListenerId};
pub use error::{FeedError, FeedResult};
pub use gate::PersistenceGate;
pub use queue::OutboundQueue;
pub use sinks::{
    Collaborators, CredentialProvider, FatalNotifier, MessageStore, MutationSink, SinkError,
    SinkFuture,
};
pub use state::{ConnectionState, SharedFeedState};
pub use supervisor::{FeedHandle, Supervisor};
pub use transport::{Transport, TransportError, TransportResult, WebSocketTransport};

#[cfg(test)]
mod test_helpers;
