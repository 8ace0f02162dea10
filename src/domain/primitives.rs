//! Domain primitives: TimeMs, Address.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Time in milliseconds since Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeMs(pub i64);

impl TimeMs {
    /// Create a TimeMs from milliseconds.
    pub fn new(ms: i64) -> Self {
        TimeMs(ms)
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        TimeMs(chrono::Utc::now().timestamp_millis())
    }

    /// Get the underlying milliseconds value.
    pub fn as_ms(&self) -> i64 {
        self.0
    }

    /// Whole minutes elapsed since `earlier`, zero if `earlier` is in the future.
    pub fn minutes_since(&self, earlier: TimeMs) -> u64 {
        let elapsed = self.0.saturating_sub(earlier.0).max(0);
        (elapsed / 60_000) as u64
    }
}

/// Account identifier (owner of a trove, pool or token holder).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid address: {0:?}")]
pub struct AddressParseError(pub String);

impl Address {
    /// Create an Address from a string.
    pub fn new(addr: impl Into<String>) -> Self {
        Address(addr.into())
    }

    /// Get the address as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    /// Addresses are trimmed and lowercased; empty or whitespace-bearing input is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
            return Err(AddressParseError(s.to_string()));
        }
        Ok(Address(trimmed.to_lowercase()))
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
