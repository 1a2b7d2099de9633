use crate::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum number of random bytes behind a paste id (64 bits of entropy)
pub const MIN_ID_BYTES: usize = 8;

/// Opaque paste identifier, rendered as lowercase hex
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PasteId(String);

impl PasteId {
    /// Build an id from raw random bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MIN_ID_BYTES {
            return Err(Error::InvalidArgument(format!(
                "paste id needs at least {} bytes, got {}",
                MIN_ID_BYTES,
                bytes.len()
            )));
        }
        Ok(Self(hex::encode(bytes)))
    }

    /// Parse an id received from a caller.
    ///
    /// Accepts only what `from_bytes` can produce: an even number of
    /// lowercase hex digits, at least `2 * MIN_ID_BYTES` long.
    pub fn parse(s: &str) -> Result<Self> {
        let well_formed = s.len() >= MIN_ID_BYTES * 2
            && s.len() % 2 == 0
            && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if !well_formed {
            return Err(Error::InvalidArgument(format!("malformed paste id: {:?}", s)));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Stripe selection for the striped table
    pub fn stripe(&self, num_stripes: usize) -> usize {
        crc32fast::hash(self.0.as_bytes()) as usize % num_stripes
    }
}

impl fmt::Display for PasteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Instant in milliseconds since the Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub const fn as_millis(&self) -> i64 {
        self.0
    }

    /// Wall-clock time
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    /// `self + secs` seconds, or None if it does not fit
    pub fn checked_add_secs(&self, secs: u64) -> Option<Self> {
        let ms = i64::try_from(secs).ok()?.checked_mul(1000)?;
        self.0.checked_add(ms).map(Self)
    }

    /// `self + ms` milliseconds, saturating at the representable range
    pub fn saturating_add_millis(&self, ms: i64) -> Self {
        Self(self.0.saturating_add(ms))
    }

    /// RFC 3339 with millisecond precision, e.g. `2024-01-01T00:00:00.000Z`
    pub fn to_rfc3339(&self) -> String {
        match DateTime::<Utc>::from_timestamp_millis(self.0) {
            Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
            None => self.0.to_string(),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

/// A stored paste.
///
/// Everything except `current_views` is fixed at creation. `current_views`
/// only moves through [`crate::Mutation::IncrementViews`] inside a store's
/// conditional update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasteRecord {
    pub id: PasteId,
    pub content: String,
    /// Requested lifetime, kept for reference; expiry is decided by `expires_at`
    pub ttl_seconds: Option<u64>,
    pub max_views: Option<u64>,
    pub current_views: u64,
    pub created_at: Timestamp,
    pub expires_at: Option<Timestamp>,
}

impl PasteRecord {
    /// Build a fresh record with zero views.
    ///
    /// `expires_at` is captured here as `created_at + ttl_seconds` and never
    /// recomputed.
    pub fn new(
        id: PasteId,
        content: impl Into<String>,
        ttl_seconds: Option<u64>,
        max_views: Option<u64>,
        created_at: Timestamp,
    ) -> Result<Self> {
        let content = content.into();
        if content.is_empty() {
            return Err(Error::InvalidArgument("content must not be empty".into()));
        }
        if ttl_seconds == Some(0) {
            return Err(Error::InvalidArgument("ttl_seconds must be >= 1".into()));
        }
        if max_views == Some(0) {
            return Err(Error::InvalidArgument("max_views must be >= 1".into()));
        }

        let expires_at = match ttl_seconds {
            Some(ttl) => Some(created_at.checked_add_secs(ttl).ok_or_else(|| {
                Error::InvalidArgument(format!("ttl_seconds {} is out of range", ttl))
            })?),
            None => None,
        };

        Ok(Self {
            id,
            content,
            ttl_seconds,
            max_views,
            current_views: 0,
            created_at,
            expires_at,
        })
    }

    /// Views left before the quota is exhausted; None when unlimited
    pub fn remaining_views(&self) -> Option<u64> {
        self.max_views
            .map(|max| max.saturating_sub(self.current_views))
    }
}
