//! Harness error types.
//!
//! The variants follow how a feature can go wrong: it could not be submitted,
//! a signal or update could not be delivered, the backend lacks something it
//! needs (a skip, not a failure), its outcome did not match, or the expected
//! fixture could not be loaded. None of them stop the batch.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use vigil_client::ClientError;
use vigil_engine::EngineError;
use vigil_types::ConverterError;

/// Result type for harness operations.
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Harness error type.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The workflow could not be submitted.
    #[error("Submission failed: {0}")]
    Submission(#[source] ClientError),

    /// A signal or update could not be delivered.
    #[error("Delivery failed: {0}")]
    Delivery(#[source] ClientError),

    /// Waiting for or reading the run's outcome failed.
    #[error("Run failed: {0}")]
    Run(#[source] ClientError),

    /// The backend lacks a capability the feature needs.
    #[error("Skipped: {0}")]
    Skipped(String),

    /// The observed outcome differs from the expected one.
    #[error("Mismatch in {what}: expected {expected}, got {actual}")]
    Mismatch {
        what: String,
        expected: String,
        actual: String,
    },

    /// The expected payload fixture could not be loaded.
    #[error("Failed to load fixture '{}': {reason}", path.display())]
    FixtureLoad { path: PathBuf, reason: String },

    /// A custom check failed.
    #[error("Check failed: {0}")]
    Check(String),

    /// The feature descriptor is inconsistent.
    #[error("Invalid feature '{name}': {reason}")]
    InvalidFeature { name: String, reason: String },

    /// The feature's worker could not be started.
    #[error("Worker error: {0}")]
    Worker(#[from] EngineError),

    /// Replaying the closed run produced different commands.
    #[error("Replay check failed: {0}")]
    Replay(String),

    /// The feature exceeded its wall-clock limit.
    #[error("Feature timed out after {0:?}")]
    Timeout(Duration),

    /// The batch was cancelled before the feature finished.
    #[error("Cancelled")]
    Cancelled,

    /// Payload conversion failed.
    #[error("Converter error: {0}")]
    Converter(#[from] ConverterError),
}

impl HarnessError {
    /// Whether this is a skip rather than a failure.
    pub fn is_skip(&self) -> bool {
        matches!(self, HarnessError::Skipped(_))
    }

    /// Build a mismatch from displayable values.
    pub fn mismatch(
        what: impl Into<String>,
        expected: impl std::fmt::Display,
        actual: impl std::fmt::Display,
    ) -> Self {
        HarnessError::Mismatch {
            what: what.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_classification() {
        assert!(HarnessError::Skipped("no updates".into()).is_skip());
        assert!(!HarnessError::Check("boom".into()).is_skip());
    }

    #[test]
    fn test_mismatch_message() {
        let err = HarnessError::mismatch("result", "\"a\"", "\"b\"");
        assert_eq!(
            err.to_string(),
            "Mismatch in result: expected \"a\", got \"b\""
        );
    }

    #[test]
    fn test_fixture_message_names_path() {
        let err = HarnessError::FixtureLoad {
            path: PathBuf::from("/tmp/payload.json"),
            reason: "missing".into(),
        };
        assert!(err.to_string().contains("/tmp/payload.json"));
    }
}
