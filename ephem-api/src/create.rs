/// Paste creation request builder
///
/// Limits are carried as signed integers so that zero and negative values
/// coming from callers are rejected by validation rather than lost in a cast.

use crate::{ServiceConfig, ValidationError};
use ephem_core::{PasteId, Result as CoreResult};
use rand::RngCore;

/// A paste to be created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPaste {
    content: String,
    ttl_seconds: Option<i64>,
    max_views: Option<i64>,
}

/// Validated creation input
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ValidPaste {
    pub content: String,
    pub ttl_seconds: Option<u64>,
    pub max_views: Option<u64>,
}

impl NewPaste {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ttl_seconds: None,
            max_views: None,
        }
    }

    /// Expire this many seconds after creation
    pub fn ttl_seconds(mut self, ttl: i64) -> Self {
        self.ttl_seconds = Some(ttl);
        self
    }

    /// Allow at most this many successful views
    pub fn max_views(mut self, views: i64) -> Self {
        self.max_views = Some(views);
        self
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub(crate) fn validate(self, config: &ServiceConfig) -> Result<ValidPaste, ValidationError> {
        if self.content.is_empty() {
            return Err(ValidationError::EmptyContent);
        }
        if let Some(max) = config.max_content_bytes {
            if self.content.len() > max {
                return Err(ValidationError::ContentTooLarge {
                    len: self.content.len(),
                    max,
                });
            }
        }

        let ttl_seconds = match self.ttl_seconds {
            Some(ttl) if ttl >= 1 => Some(ttl as u64),
            Some(_) => return Err(ValidationError::InvalidTtl),
            None => None,
        };
        let max_views = match self.max_views {
            Some(views) if views >= 1 => Some(views as u64),
            Some(_) => return Err(ValidationError::InvalidMaxViews),
            None => None,
        };

        Ok(ValidPaste {
            content: self.content,
            ttl_seconds,
            max_views,
        })
    }
}

/// Fresh id from `num_bytes` bytes of the thread-local CSPRNG (OS seeded)
pub(crate) fn generate_id(num_bytes: usize) -> CoreResult<PasteId> {
    let mut bytes = vec![0u8; num_bytes];
    rand::thread_rng().fill_bytes(&mut bytes);
    PasteId::from_bytes(&bytes)
}
