//! Error types for the `iolo` core library.
//!
//! Connection files and wire frames carry their own error types
//! ([`ConnectionFileError`](crate::ConnectionFileError),
//! [`DecodeError`](crate::DecodeError)); this one covers document encoding.

use thiserror::Error;

/// Result type alias using the core [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for `iolo` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
