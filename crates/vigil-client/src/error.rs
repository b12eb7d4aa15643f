//! Client error types.

use thiserror::Error;
use vigil_types::{ConverterError, Failure};

/// Client error type.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The addressed run, namespace or registration does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A run with the same workflow id is still open.
    #[error("Workflow already started: {0}")]
    AlreadyStarted(String),

    /// The backend refused the operation.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The request was malformed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The update was rejected or its handler failed.
    #[error("Update failed: {0}")]
    UpdateFailed(Failure),

    /// The workflow closed with a failure.
    #[error("Workflow failed: {0}")]
    WorkflowFailed(Failure),

    /// The workflow exceeded its execution timeout.
    #[error("Workflow timed out")]
    WorkflowTimedOut,

    /// A client-side wait exceeded its deadline.
    #[error("Timed out waiting for {0}")]
    Timeout(String),

    /// A client-side wait was cancelled.
    #[error("Cancelled while waiting for {0}")]
    Cancelled(String),

    /// Dialing or talking to the backend failed.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Payload conversion failed.
    #[error("Converter error: {0}")]
    Converter(#[from] ConverterError),
}

impl ClientError {
    /// Wire error-type name, used for retry-policy matching.
    pub fn error_type(&self) -> &str {
        match self {
            ClientError::NotFound(_) => "NotFound",
            ClientError::AlreadyStarted(_) => "WorkflowExecutionAlreadyStarted",
            ClientError::PermissionDenied(_) => "PermissionDenied",
            ClientError::InvalidArgument(_) => "InvalidArgument",
            ClientError::UpdateFailed(f) | ClientError::WorkflowFailed(f) => &f.error_type,
            ClientError::WorkflowTimedOut => "WorkflowTimedOut",
            ClientError::Timeout(_) => "DeadlineExceeded",
            ClientError::Cancelled(_) => "Canceled",
            ClientError::Connection(_) => "Unavailable",
            ClientError::Converter(_) => "DataConverterError",
        }
    }

    /// The engine failure carried by this error, if any.
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            ClientError::UpdateFailed(f) | ClientError::WorkflowFailed(f) => Some(f),
            _ => None,
        }
    }

    /// Convert into a failure suitable for recording in history.
    pub fn into_failure(self) -> Failure {
        match self {
            ClientError::UpdateFailed(f) | ClientError::WorkflowFailed(f) => f,
            other => Failure::new(other.error_type().to_string(), other.to_string()),
        }
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
    }

    /// Check if this is a deadline or cancellation error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Timeout(_) | ClientError::Cancelled(_))
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_type_of_failure_is_verbatim() {
        let err = ClientError::UpdateFailed(Failure::new("MyCustomError", "boom"));
        assert_eq!(err.error_type(), "MyCustomError");
        assert_eq!(err.into_failure().error_type, "MyCustomError");
    }

    #[test]
    fn test_permission_denied_failure() {
        let failure = ClientError::PermissionDenied("updates disabled".into()).into_failure();
        assert_eq!(failure.error_type, "PermissionDenied");
        assert!(failure.message.contains("updates disabled"));
    }

    #[test]
    fn test_predicates() {
        assert!(ClientError::NotFound("x".into()).is_not_found());
        assert!(ClientError::Timeout("result".into()).is_timeout());
        assert!(ClientError::Cancelled("result".into()).is_timeout());
        assert!(!ClientError::WorkflowTimedOut.is_timeout());
    }
}
