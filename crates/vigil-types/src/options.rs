//! Submission and activity options.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Options for starting a workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StartWorkflowOptions {
    /// Workflow id; generated when empty.
    #[serde(default)]
    pub id: String,
    /// Task-routing key; the harness fills in the per-feature queue when empty.
    #[serde(default)]
    pub task_queue: String,
    /// Whole-run timeout.
    #[serde(default)]
    pub execution_timeout: Option<Duration>,
}

/// Retry policy applied to activity attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub initial_interval: Duration,
    /// Multiplier applied to the delay after each attempt.
    pub backoff_coefficient: f64,
    /// Upper bound on the delay between attempts.
    pub maximum_interval: Duration,
    /// Attempt limit; zero means unlimited.
    pub maximum_attempts: u32,
    /// Error types that stop retrying immediately.
    #[serde(default)]
    pub non_retryable_error_types: Vec<String>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            backoff_coefficient: 2.0,
            maximum_interval: Duration::from_secs(100),
            maximum_attempts: 0,
            non_retryable_error_types: Vec::new(),
        }
    }
}

impl RetryPolicy {
    /// Whether a failure of `error_type` may be retried under this policy.
    pub fn is_retryable(&self, error_type: &str) -> bool {
        !self
            .non_retryable_error_types
            .iter()
            .any(|t| t == error_type)
    }

    /// Whether another attempt is allowed after `attempt` attempts.
    pub fn allows_attempt(&self, attempt: u32) -> bool {
        self.maximum_attempts == 0 || attempt < self.maximum_attempts
    }

    /// Delay to wait after the given (1-based) attempt failed.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(30) as i32;
        let secs = self.initial_interval.as_secs_f64() * self.backoff_coefficient.powi(exponent);
        // NaN and negative products clamp to zero.
        let secs = secs.max(0.0).min(self.maximum_interval.as_secs_f64());
        Duration::try_from_secs_f64(secs).unwrap_or(self.maximum_interval)
    }
}

/// Options for one activity invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityOptions {
    /// Limit on a single attempt.
    pub start_to_close_timeout: Duration,
    /// Retry policy; engine default when absent.
    #[serde(default)]
    pub retry_policy: Option<RetryPolicy>,
}

impl ActivityOptions {
    /// Options with the given per-attempt timeout and default retries.
    pub fn with_timeout(start_to_close_timeout: Duration) -> Self {
        Self {
            start_to_close_timeout,
            retry_policy: None,
        }
    }

    /// Set the retry policy.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }
}

impl Default for ActivityOptions {
    fn default() -> Self {
        Self::with_timeout(Duration::from_secs(10))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_policy_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.initial_interval, Duration::from_secs(1));
        assert_eq!(policy.maximum_attempts, 0);
        assert!(policy.allows_attempt(1_000));
        assert!(policy.is_retryable("Anything"));
    }

    #[test]
    fn test_non_retryable_types() {
        let policy = RetryPolicy {
            non_retryable_error_types: vec!["PermissionDenied".into()],
            ..RetryPolicy::default()
        };
        assert!(!policy.is_retryable("PermissionDenied"));
        assert!(policy.is_retryable("Timeout"));
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy {
            initial_interval: Duration::from_secs(1),
            backoff_coefficient: 2.0,
            maximum_interval: Duration::from_secs(5),
            ..RetryPolicy::default()
        };
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
        assert_eq!(policy.backoff(3), Duration::from_secs(4));
        assert_eq!(policy.backoff(4), Duration::from_secs(5));
    }

    #[test]
    fn test_backoff_never_negative() {
        let policy = RetryPolicy {
            backoff_coefficient: -2.0,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.backoff(2), Duration::ZERO);
        assert_eq!(policy.backoff(3), Duration::from_secs(4));

        let nan = RetryPolicy {
            backoff_coefficient: f64::NAN,
            ..RetryPolicy::default()
        };
        assert_eq!(nan.backoff(2), Duration::ZERO);
    }

    #[test]
    fn test_attempt_limit() {
        let policy = RetryPolicy {
            maximum_attempts: 3,
            ..RetryPolicy::default()
        };
        assert!(policy.allows_attempt(2));
        assert!(!policy.allows_attempt(3));
    }
}
