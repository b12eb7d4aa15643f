//! Failures recorded by the engine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A failure as recorded in workflow history and returned to callers.
///
/// `error_type` is the name retry policies match against; it travels
/// verbatim from the point of failure to whoever observes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// Human-readable message.
    pub message: String,
    /// Application-level error type name.
    pub error_type: String,
    /// Set when the failure must not be retried regardless of policy.
    #[serde(default)]
    pub non_retryable: bool,
    /// Underlying failure, if this one wraps another.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<Failure>>,
}

impl Failure {
    /// Create a retryable failure of the given type.
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_type: error_type.into(),
            non_retryable: false,
            cause: None,
        }
    }

    /// Create a failure that is never retried.
    pub fn non_retryable(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            non_retryable: true,
            ..Self::new(error_type, message)
        }
    }

    /// Attach an underlying cause.
    pub fn with_cause(mut self, cause: Failure) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// The innermost failure in the cause chain.
    pub fn root_cause(&self) -> &Failure {
        let mut current = self;
        while let Some(cause) = current.cause.as_deref() {
            current = cause;
        }
        current
    }

    /// Whether this failure or any of its causes has the given type.
    pub fn has_type(&self, error_type: &str) -> bool {
        let mut current = Some(self);
        while let Some(failure) = current {
            if failure.error_type == error_type {
                return true;
            }
            current = failure.cause.as_deref();
        }
        false
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.error_type)?;
        if let Some(cause) = &self.cause {
            write!(f, ": {cause}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Failure {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cause_chain() {
        let failure = Failure::new("ActivityError", "activity failed")
            .with_cause(Failure::non_retryable("PermissionDenied", "updates disabled"));
        assert!(failure.has_type("PermissionDenied"));
        assert!(failure.has_type("ActivityError"));
        assert!(!failure.has_type("Timeout"));
        assert_eq!(failure.root_cause().error_type, "PermissionDenied");
        assert!(failure.root_cause().non_retryable);
    }

    #[test]
    fn test_display_includes_cause() {
        let failure = Failure::new("A", "outer").with_cause(Failure::new("B", "inner"));
        assert_eq!(failure.to_string(), "outer (A): inner (B)");
    }
}
