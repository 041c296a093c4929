// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for till-core operations.

use thiserror::Error;

/// All possible errors that can occur in till-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("envelope has no event kind")]
    EmptyKind,

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience Result type alias for till-core.
pub type Result<T> = std::result::Result<T, Error>;
