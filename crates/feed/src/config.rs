// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Feed configuration.
//!
//! All fields carry serde defaults so a partial TOML file loads; an absent
//! file is equivalent to [`FeedConfig::default`].

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FeedError, FeedResult};

/// Configuration for the event-feed connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// WebSocket server URL the application connects to by default.
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Initial reconnect backoff in milliseconds (default: 3000).
    #[serde(default = "default_reconnect_base_ms")]
    pub reconnect_base_ms: u64,

    /// Maximum reconnect backoff in milliseconds (default: 30000).
    #[serde(default = "default_reconnect_cap_ms")]
    pub reconnect_cap_ms: u64,

    /// Maximum reconnection attempts before giving up (default: 10).
    #[serde(default = "default_reconnect_max_attempts")]
    pub reconnect_max_attempts: u32,

    /// Heartbeat probe interval in milliseconds (default: 30000). 0 = disabled.
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
}

fn default_server_url() -> String {
    "ws://127.0.0.1:50000/ws".to_string()
}

fn default_reconnect_base_ms() -> u64 {
    3_000
}

fn default_reconnect_cap_ms() -> u64 {
    30_000
}

fn default_reconnect_max_attempts() -> u32 {
    10
}

fn default_heartbeat_interval_ms() -> u64 {
    30_000
}

impl Default for FeedConfig {
    fn default() -> Self {
        FeedConfig {
            server_url: default_server_url(),
            reconnect_base_ms: default_reconnect_base_ms(),
            reconnect_cap_ms: default_reconnect_cap_ms(),
            reconnect_max_attempts: default_reconnect_max_attempts(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
        }
    }
}

impl FeedConfig {
    /// Loads configuration from a TOML file.
    pub fn load(path: &Path) -> FeedResult<Self> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| FeedError::Config(format!("invalid feed config: {}", e)))
    }

    /// Writes configuration to a TOML file.
    pub fn save(&self, path: &Path) -> FeedResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| FeedError::Config(format!("cannot serialize feed config: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }
}
