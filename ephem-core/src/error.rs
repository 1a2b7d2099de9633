use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Paste already exists: {0}")]
    AlreadyExists(String),

    #[error("Checksum mismatch")]
    ChecksumMismatch,

    #[error("Invalid expression: {0}")]
    InvalidExpression(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns a stable error code for this error variant.
    /// These codes are stable and can be used by clients for error classification.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Io(_) => "IO_ERROR",
            Error::Corruption(_) => "CORRUPTION",
            Error::InvalidArgument(_) => "INVALID_ARGUMENT",
            Error::AlreadyExists(_) => "ALREADY_EXISTS",
            Error::ChecksumMismatch => "CHECKSUM_MISMATCH",
            Error::InvalidExpression(_) => "INVALID_EXPRESSION",
            Error::Unavailable(_) => "UNAVAILABLE",
            Error::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns true if this error is potentially retryable.
    ///
    /// Transient errors like IO errors are retryable, while logical errors
    /// like InvalidArgument or AlreadyExists are not. The store never retries
    /// on its own; this is a hint for callers.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Io(_) => true,
            Error::Unavailable(_) => true,

            Error::Corruption(_) => false,
            Error::InvalidArgument(_) => false,
            Error::AlreadyExists(_) => false,
            Error::ChecksumMismatch => false,
            Error::InvalidExpression(_) => false,
            Error::Internal(_) => false,
        }
    }

    /// Adds context to an error by wrapping it in an Internal error.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ephem_core::Error;
    ///
    /// fn replay() -> Result<(), Error> {
    ///     Err(Error::ChecksumMismatch)
    /// }
    ///
    /// fn open_store() -> Result<(), Error> {
    ///     replay().map_err(|e| e.with_context("failed to replay paste log"))
    /// }
    /// ```
    pub fn with_context(self, context: &str) -> Error {
        Error::Internal(format!("{}: {}", context, self))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
