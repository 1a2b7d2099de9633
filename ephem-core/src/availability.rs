/// Availability rules for a paste at a given instant
///
/// A paste can be consumed while it is neither time-expired nor
/// quota-exhausted. Expiry is inclusive: at `now == expires_at` the paste is
/// already gone.

use crate::{PasteRecord, Timestamp};

/// Why a paste can or cannot be consumed at some instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Available,
    Expired,
    Exhausted,
}

impl Availability {
    /// Classify a record at `now`. Expiry wins over exhaustion when both hold.
    pub fn of(record: &PasteRecord, now: Timestamp) -> Self {
        if let Some(expires_at) = record.expires_at {
            if now >= expires_at {
                return Availability::Expired;
            }
        }
        if let Some(max_views) = record.max_views {
            if record.current_views >= max_views {
                return Availability::Exhausted;
            }
        }
        Availability::Available
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::Available => "available",
            Availability::Expired => "expired",
            Availability::Exhausted => "exhausted",
        }
    }
}

/// Whether `record` may still be consumed at `now`
pub fn is_available(record: &PasteRecord, now: Timestamp) -> bool {
    Availability::of(record, now).is_available()
}
