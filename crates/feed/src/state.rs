// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared connection state observable without a round-trip through the
//! supervisor loop.
//!
//! Uses atomic fields for lock-free reads from UI threads. Only the
//! supervisor writes; everyone else reads.

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, AtomicUsize, Ordering};

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    /// No connection and no attempt in flight.
    Disconnected = 0,
    /// A connection attempt is in flight.
    Connecting = 1,
    /// The duplex channel is open.
    Connected = 2,
    /// A manual close is being carried out.
    Closing = 3,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            3 => ConnectionState::Closing,
            _ => ConnectionState::Disconnected,
        }
    }
}

/// Feed state visible to both the supervisor loop and external observers.
pub struct SharedFeedState {
    /// Current state (atomic for lock-free reads).
    state: AtomicU8,
    /// Count of consecutive failed connection attempts.
    attempt: AtomicU32,
    /// Highest server-assigned envelope id seen so far.
    last_message_id: AtomicU64,
    /// Current outbound queue depth.
    queued: AtomicUsize,
}

impl SharedFeedState {
    /// Create a new shared state initialized to disconnected.
    pub fn new() -> Self {
        SharedFeedState {
            state: AtomicU8::new(ConnectionState::Disconnected as u8),
            attempt: AtomicU32::new(0),
            last_message_id: AtomicU64::new(0),
            queued: AtomicUsize::new(0),
        }
    }

    /// Get the current state.
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Set the state.
    pub fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Get the current attempt count.
    pub fn attempt(&self) -> u32 {
        self.attempt.load(Ordering::Acquire)
    }

    /// Set the attempt count.
    pub fn set_attempt(&self, attempt: u32) {
        self.attempt.store(attempt, Ordering::Release);
    }

    /// Highest server-assigned envelope id seen so far.
    ///
    /// Recorded for observation only; delivery is never filtered or
    /// reordered against it.
    pub fn last_message_id(&self) -> u64 {
        self.last_message_id.load(Ordering::Acquire)
    }

    /// Record a server-assigned envelope id, keeping the maximum.
    pub fn record_message_id(&self, id: u64) {
        self.last_message_id.fetch_max(id, Ordering::AcqRel);
    }

    /// Current outbound queue depth.
    ///
    /// Back-pressure polling surface: the queue itself is unbounded.
    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::Acquire)
    }

    /// Set the outbound queue depth.
    pub fn set_queued(&self, depth: usize) {
        self.queued.store(depth, Ordering::Release);
    }

    /// Check if currently connected.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Get a human-readable status string.
    pub fn status_string(&self) -> String {
        match self.state() {
            ConnectionState::Disconnected => "disconnected".to_string(),
            ConnectionState::Connecting => {
                let attempt = self.attempt();
                if attempt > 0 {
                    format!("connecting (attempt {})", attempt)
                } else {
                    "connecting".to_string()
                }
            }
            ConnectionState::Connected => "connected".to_string(),
            ConnectionState::Closing => "closing".to_string(),
        }
    }
}

impl Default for SharedFeedState {
    fn default() -> Self {
        Self::new()
    }
}
