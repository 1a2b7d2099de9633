/// Consumption results and the payload projected from them

use ephem_core::{PasteRecord, Timestamp};
use serde::Serialize;

/// Outcome of a consume call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Consumed {
    /// One view was granted
    Granted(Consumption),
    /// Unknown id, expired, or out of views. Deliberately not distinguished.
    NotAvailable,
}

impl Consumed {
    pub fn is_granted(&self) -> bool {
        matches!(self, Consumed::Granted(_))
    }

    pub fn granted(self) -> Option<Consumption> {
        match self {
            Consumed::Granted(consumption) => Some(consumption),
            Consumed::NotAvailable => None,
        }
    }
}

/// A granted view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consumption {
    /// Record after the increment
    pub record: PasteRecord,
    /// Instant availability was evaluated at
    pub at: Timestamp,
}

impl Consumption {
    pub fn content(&self) -> &str {
        &self.record.content
    }

    /// `max_views - current_views` after this view; None when unlimited
    pub fn remaining_views(&self) -> Option<u64> {
        self.record.remaining_views()
    }

    pub fn view(&self) -> PasteView {
        PasteView {
            content: self.record.content.clone(),
            remaining_views: self.remaining_views(),
            expires_at: self.record.expires_at.map(|ts| ts.to_rfc3339()),
        }
    }
}

/// JSON payload for a granted view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasteView {
    pub content: String,
    pub remaining_views: Option<u64>,
    /// RFC 3339
    pub expires_at: Option<String>,
}
