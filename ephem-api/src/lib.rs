use ephem_core::{
    Availability, Condition, ConditionalUpdate, DiskStore, Error as CoreError, MemoryStore,
    Mutation, PasteStore,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

pub use ephem_core::{
    Clock, Error as StoreError, FixedClock, PasteId, PasteRecord, StoreConfig, StoreStats,
    SystemClock, Timestamp,
};

pub mod error;
pub use error::{Error, Result, ValidationError};

pub mod config;
pub use config::ServiceConfig;

pub mod create;
pub use create::NewPaste;

pub mod view;
pub use view::{Consumed, Consumption, PasteView};

/// Ephem paste service handle.
///
/// Wraps a store with the two operations callers need: `create` and
/// `consume`. Each has an `_at` form taking an explicit instant; the plain
/// form reads the handle's clock.
pub struct Pastes {
    store: Arc<dyn PasteStore>,
    clock: Arc<dyn Clock>,
    config: ServiceConfig,
}

/// Store reachability as seen by the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Health {
    pub ok: bool,
    pub error: Option<String>,
}

impl Pastes {
    /// Service over an in-memory store
    pub fn in_memory() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    /// Service over a durable store in `path`, created if missing
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, StoreConfig::default())
    }

    pub fn open_with_config(path: impl AsRef<Path>, config: StoreConfig) -> Result<Self> {
        let store = DiskStore::open_or_create(path, config)?;
        Ok(Self::with_store(Arc::new(store)))
    }

    /// Service over any store
    pub fn with_store(store: Arc<dyn PasteStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            config: ServiceConfig::default(),
        }
    }

    /// Replace the default clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: ServiceConfig) -> Result<Self> {
        config.validate().map_err(Error::InvalidConfig)?;
        self.config = config;
        Ok(self)
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// The default instant for calls without an explicit one
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Create a paste at the clock's current instant
    pub fn create(&self, new: NewPaste) -> Result<PasteRecord> {
        self.create_at(new, self.now())
    }

    /// Create a paste as of `now`.
    ///
    /// `expires_at` becomes `now + ttl_seconds`. An id collision is retried
    /// with a fresh id up to `max_id_attempts` times; an existing paste is
    /// never overwritten.
    pub fn create_at(&self, new: NewPaste, now: Timestamp) -> Result<PasteRecord> {
        let valid = new.validate(&self.config)?;
        if let Some(ttl) = valid.ttl_seconds {
            if now.checked_add_secs(ttl).is_none() {
                return Err(ValidationError::TtlOutOfRange(ttl).into());
            }
        }

        let mut record = PasteRecord::new(
            self.fresh_id()?,
            valid.content,
            valid.ttl_seconds,
            valid.max_views,
            now,
        )?;

        let attempts = self.config.max_id_attempts;
        for attempt in 1..=attempts {
            match self.store.insert(record.clone()) {
                Ok(()) => {
                    debug!(
                        id = %record.id,
                        ttl_seconds = ?record.ttl_seconds,
                        max_views = ?record.max_views,
                        "created paste"
                    );
                    return Ok(record);
                }
                Err(CoreError::AlreadyExists(_)) => {
                    warn!(id = %record.id, attempt, "paste id collision");
                    record.id = self.fresh_id()?;
                }
                Err(e) => {
                    warn!(error = %e, code = e.code(), "paste insert failed");
                    return Err(Error::StoreUnavailable(e));
                }
            }
        }

        Err(Error::IdSpaceExhausted(attempts))
    }

    fn fresh_id(&self) -> Result<PasteId> {
        create::generate_id(self.config.id_bytes).map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    /// Consume one view at the clock's current instant
    pub fn consume(&self, id: &str) -> Result<Consumed> {
        self.consume_at(id, self.now())
    }

    /// Consume one view as of `now`.
    ///
    /// Check and increment are a single conditional update in the store, so
    /// among concurrent callers on the last view exactly one is granted.
    ///
    /// Not idempotent: every grant uses up a view. A caller that times out
    /// cannot tell whether its view was taken, and retrying may consume a
    /// second one.
    pub fn consume_at(&self, id: &str, now: Timestamp) -> Result<Consumed> {
        let id = match PasteId::parse(id) {
            Ok(id) => id,
            Err(_) => {
                debug!("malformed paste id");
                return Ok(Consumed::NotAvailable);
            }
        };

        let outcome = self
            .store
            .update_if(&id, &Condition::available_at(now), Mutation::IncrementViews)
            .map_err(|e| {
                warn!(id = %id, error = %e, code = e.code(), "paste consume failed");
                Error::StoreUnavailable(e)
            })?;

        match outcome {
            ConditionalUpdate::Applied(record) => {
                debug!(id = %id, views = record.current_views, "granted paste view");
                Ok(Consumed::Granted(Consumption { record, at: now }))
            }
            ConditionalUpdate::ConditionFailed(current) => {
                debug!(
                    id = %id,
                    reason = Availability::of(&current, now).as_str(),
                    "paste not available"
                );
                Ok(Consumed::NotAvailable)
            }
            ConditionalUpdate::Missing => {
                debug!(id = %id, "paste not found");
                Ok(Consumed::NotAvailable)
            }
        }
    }

    pub fn health(&self) -> Health {
        match self.store.ping() {
            Ok(()) => Health { ok: true, error: None },
            Err(e) => Health {
                ok: false,
                error: Some(e.to_string()),
            },
        }
    }

    pub fn stats(&self) -> Result<StoreStats> {
        Ok(self.store.stats()?)
    }

    pub fn flush(&self) -> Result<()> {
        Ok(self.store.flush()?)
    }
}
