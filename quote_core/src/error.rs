//! Error types shared by the quote store, the reconciler and the CLI.
//!
//! The `QuoteError` enum carries the domain failures (validation, format, empty
//! selection, sync, persistence) together with wrappers for the library errors that
//! can occur underneath them, allowing every layer to propagate a single error type.
use std::io;
use std::sync::PoisonError;

use thiserror::Error;

/// Unified error type for store, storage and sync operations.
#[derive(Error, Debug)]
pub enum QuoteError {
    /// A required field was missing or empty after trimming.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Persisted or imported data does not have the expected shape.
    #[error("Format error: {0}")]
    Format(String),

    /// No quote matches the active category filter.
    #[error("No quotes found in category: {0}")]
    EmptySelection(String),

    /// Network, timeout or parse failure during a reconciliation pass.
    #[error("Sync failed: {0}")]
    Sync(String),

    /// A storage write did not happen (quota, read-only directory, etc.).
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// I/O error originating from the standard library or files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Failure while encoding/decoding JSON via serde_json.
    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// Error indicating a poisoned mutex/lock was encountered.
    #[error("Mutex Lock Poisoned: {0}")]
    MutexLock(String),
}

impl QuoteError {
    /// Whether the error should reach the user as a transient notification.
    ///
    /// Validation problems block the originating action and are shown inline instead;
    /// an empty selection is rendered as an empty state.
    pub fn is_user_visible(&self) -> bool {
        matches!(self, QuoteError::Persistence(_) | QuoteError::Sync(_))
    }
}

impl<T> From<PoisonError<T>> for QuoteError {
    fn from(err: PoisonError<T>) -> Self {
        QuoteError::MutexLock(err.to_string())
    }
}

impl From<reqwest::Error> for QuoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            QuoteError::Sync(format!("request timed out: {}", err))
        } else {
            QuoteError::Sync(err.to_string())
        }
    }
}
