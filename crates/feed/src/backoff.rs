// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Reconnect backoff policy.
//!
//! Pure delay computation; the supervisor owns the single pending retry
//! timer and consults the policy when scheduling it.

use std::time::Duration;

/// Default initial backoff in milliseconds.
pub const DEFAULT_BASE_MS: u64 = 3_000;
/// Default backoff cap in milliseconds.
pub const DEFAULT_CAP_MS: u64 = 30_000;
/// Default attempt limit.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Backoff policy for reconnection attempts.
///
/// The delay grows by a factor of 1.5 per consecutive failure and is
/// capped; once the attempt count reaches the limit no further retry may
/// be scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    base_ms: u64,
    cap_ms: u64,
    max_attempts: u32,
}

impl ReconnectPolicy {
    /// Create a policy with explicit parameters.
    pub fn new(base_ms: u64, cap_ms: u64, max_attempts: u32) -> Self {
        ReconnectPolicy {
            base_ms,
            cap_ms,
            max_attempts,
        }
    }

    /// Delay before the retry following `attempt` consecutive failures.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let scaled = (self.base_ms as f64) * 1.5_f64.powi(exponent);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let capped = scaled.min(self.cap_ms as f64) as u64;
        Duration::from_millis(capped)
    }

    /// True once no further retry may be scheduled.
    pub fn is_exhausted(&self, attempt: u32) -> bool {
        attempt >= self.max_attempts
    }

    /// The attempt limit.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy::new(DEFAULT_BASE_MS, DEFAULT_CAP_MS, DEFAULT_MAX_ATTEMPTS)
    }
}
