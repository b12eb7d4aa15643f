//! Activity execution.
//!
//! Activities run on the tokio runtime, outside the workflow's replay loop.
//! Each attempt is bounded by the start-to-close timeout; failed attempts are
//! retried under the activity's retry policy until the failure is marked
//! non-retryable, its type is listed as non-retryable, or attempts run out.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, warn};
use vigil_client::{ClientError, Connection, Dialer};
use vigil_types::{ActivityOptions, ConnectionMaterial, Failure, Payload, Payloads, WorkflowExecution};

use crate::definition::ActivityDefinition;
use crate::error::ActivityError;

/// Error type of the failure wrapping an activity's last attempt.
pub const ACTIVITY_ERROR: &str = "ActivityError";

/// Error type recorded when an attempt exceeds its start-to-close timeout.
pub const START_TO_CLOSE_TIMEOUT: &str = "StartToCloseTimeout";

/// Error type recorded when activity code panics.
pub const PANIC_ERROR: &str = "PanicError";

/// Facts about the running activity attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityInfo {
    /// The workflow that scheduled the activity.
    pub workflow_execution: WorkflowExecution,
    /// Schedule sequence number within the run.
    pub seq: u32,
    /// Registered activity type.
    pub activity_type: String,
    /// 1-based attempt number.
    pub attempt: u32,
    /// Task queue the activity runs on.
    pub task_queue: String,
}

/// Handle passed to activity code.
#[derive(Clone)]
pub struct ActivityContext {
    info: ActivityInfo,
    dialer: Option<Arc<dyn Dialer>>,
}

impl ActivityContext {
    /// Build a context. Activities only need this in tests.
    pub fn new(info: ActivityInfo, dialer: Option<Arc<dyn Dialer>>) -> Self {
        Self { info, dialer }
    }

    /// Facts about this attempt.
    pub fn info(&self) -> &ActivityInfo {
        &self.info
    }

    /// Open a connection to the engine described by `material`.
    ///
    /// The connection is released when dropped.
    pub async fn connect(&self, material: &ConnectionMaterial) -> Result<Connection, ClientError> {
        let dialer = self.dialer.as_ref().ok_or_else(|| {
            ClientError::Connection(format!("no route to '{}'", material.endpoint))
        })?;
        dialer.dial(material).await
    }
}

impl std::fmt::Debug for ActivityContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityContext")
            .field("info", &self.info)
            .field("can_dial", &self.dialer.is_some())
            .finish()
    }
}

/// Final outcome of an activity after retries.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ActivityOutcome {
    Completed { attempt: u32, result: Payload },
    Failed { attempt: u32, failure: Failure },
}

/// Run `definition` until it succeeds or the retry policy gives up.
pub(crate) async fn run_activity(
    definition: ActivityDefinition,
    info: ActivityInfo,
    args: Payloads,
    options: ActivityOptions,
    dialer: Option<Arc<dyn Dialer>>,
) -> ActivityOutcome {
    let policy = options.retry_policy.clone().unwrap_or_default();
    let mut attempt = 1;
    loop {
        let ctx = ActivityContext::new(
            ActivityInfo {
                attempt,
                ..info.clone()
            },
            dialer.clone(),
        );
        // The factory runs inside the guard so a synchronous panic is caught too.
        let call_args = args.clone();
        let invocation =
            AssertUnwindSafe(async { definition.invoke(ctx, call_args).await }).catch_unwind();
        let result = match tokio::time::timeout(options.start_to_close_timeout, invocation).await {
            Ok(Ok(result)) => result.map_err(ActivityError::into_failure),
            Ok(Err(_)) => Err(Failure::non_retryable(
                PANIC_ERROR,
                format!("activity '{}' panicked", info.activity_type),
            )),
            Err(_) => Err(Failure::new(
                START_TO_CLOSE_TIMEOUT,
                format!(
                    "activity '{}' exceeded {:?}",
                    info.activity_type, options.start_to_close_timeout
                ),
            )),
        };

        let failure = match result {
            Ok(result) => {
                debug!(activity = %info.activity_type, seq = info.seq, attempt, "Activity completed");
                return ActivityOutcome::Completed { attempt, result };
            }
            Err(failure) => failure,
        };

        let retry = !failure.non_retryable
            && policy.is_retryable(&failure.error_type)
            && policy.allows_attempt(attempt);
        if !retry {
            debug!(
                activity = %info.activity_type,
                seq = info.seq,
                attempt,
                error_type = %failure.error_type,
                "Activity failed"
            );
            let wrapped = Failure::new(
                ACTIVITY_ERROR,
                format!(
                    "activity '{}' failed after {attempt} attempt(s)",
                    info.activity_type
                ),
            )
            .with_cause(failure);
            return ActivityOutcome::Failed {
                attempt,
                failure: wrapped,
            };
        }

        let delay = policy.backoff(attempt);
        warn!(
            activity = %info.activity_type,
            attempt,
            error = %failure,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "Activity attempt failed, retrying"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
