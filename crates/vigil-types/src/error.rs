//! Data conversion error types.

use thiserror::Error;

/// Result type for payload conversion.
pub type Result<T> = std::result::Result<T, ConverterError>;

/// Errors raised while encoding or decoding payloads.
#[derive(Debug, Error)]
pub enum ConverterError {
    /// The payload carries no `encoding` metadata entry.
    #[error("payload has no encoding metadata")]
    MissingEncoding,

    /// The payload's encoding cannot be decoded into the requested type.
    #[error("cannot decode '{found}' payload as {expected}")]
    EncodingMismatch {
        /// Encoding the caller can accept.
        expected: &'static str,
        /// Encoding recorded in the payload metadata.
        found: String,
    },

    /// The `encoding` metadata is not valid UTF-8.
    #[error("payload encoding metadata is not UTF-8")]
    InvalidEncoding,

    /// A required argument was not supplied.
    #[error("missing argument at position {0}")]
    MissingArgument(usize),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
