//! Execution strategies.
//!
//! A strategy decides how a feature's workflow gets launched and what
//! interaction happens after submission. Every strategy hands back the
//! [`WorkflowRun`] the checker will inspect.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tracing::debug;
use vigil_client::WorkflowRun;
use vigil_types::{Capability, Payload, SignalEnvelope, UpdateEnvelope};

use crate::error::{HarnessError, Result};
use crate::runner::Runner;

/// How a feature is launched.
#[async_trait]
pub trait ExecutionStrategy: Send + Sync {
    /// Submit the workflow and perform any follow-up interaction.
    async fn execute(&self, runner: &Runner) -> Result<WorkflowRun>;

    /// Whether the run's stored result payload is left exactly as the
    /// workflow produced it. Checkers that compare raw bytes need this.
    fn preserves_result_payload(&self) -> bool {
        true
    }

    /// Short label used in logs and reports.
    fn describe(&self) -> String;
}

/// Submit with the feature's start options and no arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultExecution;

#[async_trait]
impl ExecutionStrategy for DefaultExecution {
    async fn execute(&self, runner: &Runner) -> Result<WorkflowRun> {
        runner.execute_default().await
    }

    fn describe(&self) -> String {
        "default".into()
    }
}

/// Submit, then deliver signals in order.
///
/// Each signal is acknowledged by the engine before the next one is sent.
#[derive(Debug, Clone)]
pub struct SignalAfterStart {
    signals: Vec<SignalEnvelope>,
}

impl SignalAfterStart {
    /// Deliver one signal after start.
    pub fn new(signal: SignalEnvelope) -> Self {
        Self {
            signals: vec![signal],
        }
    }

    /// Deliver several signals after start, in order.
    pub fn many(signals: impl IntoIterator<Item = SignalEnvelope>) -> Self {
        Self {
            signals: signals.into_iter().collect(),
        }
    }
}

#[async_trait]
impl ExecutionStrategy for SignalAfterStart {
    async fn execute(&self, runner: &Runner) -> Result<WorkflowRun> {
        let run = runner.execute_default().await?;
        for signal in &self.signals {
            debug!(workflow_id = run.id(), signal = %signal.name, "Delivering signal");
            run.signal(signal.clone())
                .await
                .map_err(HarnessError::Delivery)?;
        }
        Ok(run)
    }

    fn describe(&self) -> String {
        let names: Vec<&str> = self.signals.iter().map(|s| s.name.as_str()).collect();
        format!("signal-after-start({})", names.join(","))
    }
}

/// What the update sent by [`UpdateAfterStart`] should produce.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateExpectation {
    /// Any successful result.
    Succeeds,
    /// A successful result equal to this payload.
    ResultEquals(Payload),
    /// A failure of this error type.
    FailsWith(String),
}

/// Submit, then send one update and check its outcome.
#[derive(Debug, Clone)]
pub struct UpdateAfterStart {
    update: UpdateEnvelope,
    expectation: UpdateExpectation,
}

impl UpdateAfterStart {
    /// Send `update` and require it to succeed.
    pub fn new(update: UpdateEnvelope) -> Self {
        Self {
            update,
            expectation: UpdateExpectation::Succeeds,
        }
    }

    /// Replace the expectation.
    pub fn expecting(mut self, expectation: UpdateExpectation) -> Self {
        self.expectation = expectation;
        self
    }
}

#[async_trait]
impl ExecutionStrategy for UpdateAfterStart {
    async fn execute(&self, runner: &Runner) -> Result<WorkflowRun> {
        let run = runner.execute_default().await?;
        debug!(workflow_id = run.id(), update = %self.update.name, "Delivering update");
        let outcome = run.update(self.update.clone()).await;
        match (&self.expectation, outcome) {
            (UpdateExpectation::Succeeds, Ok(_)) => Ok(run),
            (UpdateExpectation::ResultEquals(expected), Ok(actual)) => {
                crate::checker::check_scalar(expected, &actual)?;
                Ok(run)
            }
            (UpdateExpectation::FailsWith(error_type), Err(err)) => {
                if err.error_type() == error_type {
                    Ok(run)
                } else {
                    Err(HarnessError::mismatch(
                        "update error type",
                        error_type,
                        err.error_type(),
                    ))
                }
            }
            (UpdateExpectation::FailsWith(error_type), Ok(_)) => Err(HarnessError::mismatch(
                "update outcome",
                format!("failure {error_type}"),
                "success",
            )),
            (_, Err(err)) => Err(HarnessError::Delivery(err)),
        }
    }

    fn describe(&self) -> String {
        format!("update-after-start({})", self.update.name)
    }
}

/// Skip the feature unless the backend supports `capability`, then run `inner`.
pub struct SkipUnless {
    capability: Capability,
    inner: Arc<dyn ExecutionStrategy>,
}

impl SkipUnless {
    /// Gate `inner` on `capability`.
    pub fn new(capability: Capability, inner: impl ExecutionStrategy + 'static) -> Self {
        Self {
            capability,
            inner: Arc::new(inner),
        }
    }
}

#[async_trait]
impl ExecutionStrategy for SkipUnless {
    async fn execute(&self, runner: &Runner) -> Result<WorkflowRun> {
        runner.require_capability(self.capability).await?;
        self.inner.execute(runner).await
    }

    fn preserves_result_payload(&self) -> bool {
        self.inner.preserves_result_payload()
    }

    fn describe(&self) -> String {
        format!("{} if {}", self.inner.describe(), self.capability)
    }
}

/// Boxed execution closure.
pub type ExecuteFn =
    Arc<dyn for<'a> Fn(&'a Runner) -> BoxFuture<'a, Result<WorkflowRun>> + Send + Sync>;

/// Scenario-specific execution written as a closure.
#[derive(Clone)]
pub struct CustomExecution {
    func: ExecuteFn,
    preserves_result_payload: bool,
}

impl CustomExecution {
    /// Wrap `func`.
    pub fn new<F>(func: F) -> Self
    where
        F: for<'a> Fn(&'a Runner) -> BoxFuture<'a, Result<WorkflowRun>> + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
            preserves_result_payload: true,
        }
    }

    /// Declare that this execution changes the stored result payload.
    pub fn altering_result_payload(mut self) -> Self {
        self.preserves_result_payload = false;
        self
    }
}

#[async_trait]
impl ExecutionStrategy for CustomExecution {
    async fn execute(&self, runner: &Runner) -> Result<WorkflowRun> {
        (self.func)(runner).await
    }

    fn preserves_result_payload(&self) -> bool {
        self.preserves_result_payload
    }

    fn describe(&self) -> String {
        "custom".into()
    }
}

impl std::fmt::Debug for CustomExecution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomExecution")
            .field("preserves_result_payload", &self.preserves_result_payload)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        assert_eq!(DefaultExecution.describe(), "default");
        let signals = SignalAfterStart::many([SignalEnvelope::new("a"), SignalEnvelope::new("b")]);
        assert_eq!(signals.describe(), "signal-after-start(a,b)");
        let gated = SkipUnless::new(
            Capability::Updates,
            UpdateAfterStart::new(UpdateEnvelope::new("u")),
        );
        assert_eq!(gated.describe(), "update-after-start(u) if updates");
    }

    #[test]
    fn test_payload_preservation_propagates_through_gate() {
        let altering = CustomExecution::new(|runner| Box::pin(runner.execute_default()))
            .altering_result_payload();
        assert!(!altering.preserves_result_payload());
        assert!(!SkipUnless::new(Capability::Signals, altering).preserves_result_payload());
        assert!(SkipUnless::new(Capability::Signals, DefaultExecution).preserves_result_payload());
    }
}
