//! # Entry Record
//!
//! The value tuple stored under every key: an optional payload, the
//! timestamp at which it was accepted, and an optional expiry.
//!
//! A tombstone is represented by `value = None`; a key with no TTL is
//! represented by `expires_at = None`.

use serde::{Deserialize, Serialize};

/// The unit of storage under a single key.
///
/// `Entry` is shared verbatim between the MemTable, the WAL, and
/// Segments — it is the one record format that crosses every layer of
/// the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// The stored payload, or `None` to mark a deletion (tombstone).
    pub value: Option<Vec<u8>>,

    /// Wall-clock millisecond at which this entry was accepted.
    pub timestamp: u64,

    /// Wall-clock millisecond after which this entry must be treated as
    /// absent, or `None` for "never expires".
    pub expires_at: Option<u64>,
}

impl Entry {
    /// Builds a live (non-tombstone) entry with an optional TTL.
    ///
    /// `ttl_ms = None` or `Some(0)` both mean "never expires", per the
    /// engine's TTL policy.
    pub fn new(value: Vec<u8>, now: u64, ttl_ms: Option<u64>) -> Self {
        let expires_at = match ttl_ms {
            Some(0) | None => None,
            Some(ttl) => Some(now.saturating_add(ttl)),
        };
        Self {
            value: Some(value),
            timestamp: now,
            expires_at,
        }
    }

    /// Builds a tombstone entry recorded at `now`.
    pub fn tombstone(now: u64) -> Self {
        Self {
            value: None,
            timestamp: now,
            expires_at: None,
        }
    }

    /// Whether this entry marks a deletion.
    pub fn is_tombstone(&self) -> bool {
        self.value.is_none()
    }

    /// Whether this entry's TTL has elapsed as of `now`.
    pub fn is_expired(&self, now: u64) -> bool {
        matches!(self.expires_at, Some(deadline) if now >= deadline)
    }

    /// Whether this entry is visible at `now`: not a tombstone and not expired.
    pub fn is_live(&self, now: u64) -> bool {
        !self.is_tombstone() && !self.is_expired(now)
    }
}

/// Returns the current wall-clock time in milliseconds since the UNIX epoch.
pub fn now_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before UNIX epoch")
        .as_millis() as u64
}
