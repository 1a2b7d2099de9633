use ephem_core::Error as CoreError;
use thiserror::Error;

/// Rejected creation input. Never reaches the store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("content is required and must be a non-empty string")]
    EmptyContent,

    #[error("content is {len} bytes, limit is {max}")]
    ContentTooLarge { len: usize, max: usize },

    #[error("ttl_seconds must be an integer >= 1")]
    InvalidTtl,

    #[error("max_views must be an integer >= 1")]
    InvalidMaxViews,

    #[error("ttl_seconds {0} is out of range")]
    TtlOutOfRange(u64),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Backing store failed; transient from the caller's point of view
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[source] CoreError),

    #[error("Could not allocate a unique paste id after {0} attempts")]
    IdSpaceExhausted(u32),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Stable error code, in the same spirit as `ephem_core::Error::code`
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Error::IdSpaceExhausted(_) => "ID_SPACE_EXHAUSTED",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
        }
    }
}

impl From<CoreError> for Error {
    fn from(err: CoreError) -> Self {
        Error::StoreUnavailable(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
