// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the feed supervisor.

use thiserror::Error;

use crate::transport::TransportError;

/// All possible errors surfaced through the feed public API.
#[derive(Debug, Error)]
pub enum FeedError {
    /// No credential available; the feed never connects anonymously.
    #[error("no credential available for feed connection")]
    MissingCredential,

    /// Transport-level failure.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Envelope encode/decode failure.
    #[error("codec error: {0}")]
    Codec(#[from] till_core::Error),

    /// Configuration file could not be parsed.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The supervisor loop has stopped and can no longer accept calls.
    #[error("feed supervisor is gone")]
    SupervisorGone,
}

/// Result type for feed operations.
pub type FeedResult<T> = Result<T, FeedError>;
