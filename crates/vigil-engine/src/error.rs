//! Error types for the engine.

use thiserror::Error;
use vigil_client::ClientError;
use vigil_types::{ConverterError, Failure};

/// Result type for engine administration.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors from engine administration (workers, replay).
///
/// Client-facing operations report [`ClientError`] instead, so that the
/// in-process client maps onto the engine one-to-one.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A worker is already polling the task queue.
    #[error("Task queue already has a worker: {0}")]
    WorkerConflict(String),

    /// The worker registers nothing.
    #[error("Invalid worker: {0}")]
    InvalidWorker(String),

    /// Replaying history produced different commands than were recorded.
    #[error("Nondeterminism detected: {0}")]
    Nondeterminism(String),

    /// The run is still open; it cannot be replayed as a whole.
    #[error("Run is still open: {0}")]
    RunOpen(String),

    /// Client-level failure.
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Error a workflow function returns to fail its run.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Application or activity failure.
    #[error("{0}")]
    Failed(Failure),

    /// Payload conversion failed inside the workflow.
    #[error("Converter error: {0}")]
    Converter(#[from] ConverterError),
}

impl WorkflowError {
    /// Fail with an application error of the given type.
    pub fn application(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        WorkflowError::Failed(Failure::new(error_type, message))
    }

    /// The failure recorded in history for this error.
    pub fn into_failure(self) -> Failure {
        match self {
            WorkflowError::Failed(failure) => failure,
            WorkflowError::Converter(err) => {
                Failure::non_retryable("DataConverterError", err.to_string())
            }
        }
    }
}

impl From<Failure> for WorkflowError {
    fn from(failure: Failure) -> Self {
        WorkflowError::Failed(failure)
    }
}

/// Error an activity function returns to fail its attempt.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ActivityError(pub Failure);

impl ActivityError {
    /// A failure the retry policy may retry.
    pub fn retryable(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self(Failure::new(error_type, message))
    }

    /// A failure that stops retrying immediately.
    pub fn non_retryable(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self(Failure::non_retryable(error_type, message))
    }

    /// The failure recorded for this attempt.
    pub fn into_failure(self) -> Failure {
        self.0
    }
}

impl From<ClientError> for ActivityError {
    fn from(err: ClientError) -> Self {
        Self(err.into_failure())
    }
}

impl From<ConverterError> for ActivityError {
    fn from(err: ConverterError) -> Self {
        Self(Failure::non_retryable("DataConverterError", err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_type_survives() {
        let err = ActivityError::from(ClientError::PermissionDenied("nope".into()));
        let failure = err.into_failure();
        assert_eq!(failure.error_type, "PermissionDenied");
        assert!(!failure.non_retryable);
    }

    #[test]
    fn test_converter_error_is_non_retryable() {
        let err = WorkflowError::from(ConverterError::MissingEncoding);
        let failure = err.into_failure();
        assert_eq!(failure.error_type, "DataConverterError");
        assert!(failure.non_retryable);
    }
}
