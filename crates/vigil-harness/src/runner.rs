//! Per-feature runner.
//!
//! A [`Runner`] is handed to a feature's execution strategy and result
//! checker. It owns the client, the feature's private task queue, and the
//! helpers scenario code uses to submit runs and read their results.

use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use uuid::Uuid;
use vigil_client::{SharedClient, WorkflowRun};
use vigil_types::{
    Capability, ConnectionMaterial, FromPayload, Payload, Payloads, StartWorkflowOptions,
};

use crate::checker::check_scalar;
use crate::error::{HarnessError, Result};
use crate::feature::Feature;

/// Settings shared by every feature in a batch.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Prefix for per-feature task queues.
    pub task_queue_prefix: String,
    /// Features run at the same time.
    pub concurrency: usize,
    /// Wall-clock limit for one feature.
    pub feature_timeout: Duration,
    /// Execution timeout applied when a feature sets none.
    pub execution_timeout: Duration,
    /// Replay each passing run's history.
    pub replay_check: bool,
    /// How activities reach the engine.
    pub connection: ConnectionMaterial,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            task_queue_prefix: "vigil".to_string(),
            concurrency: 4,
            feature_timeout: Duration::from_secs(120),
            execution_timeout: Duration::from_secs(60),
            replay_check: true,
            connection: ConnectionMaterial::new("localhost:7233", "default", "vigil"),
        }
    }
}

/// Drives one feature.
#[derive(Clone)]
pub struct Runner {
    feature: Arc<Feature>,
    client: SharedClient,
    task_queue: String,
    config: Arc<HarnessConfig>,
}

impl Runner {
    /// Runner for `feature` on a fresh task queue.
    pub fn new(feature: Arc<Feature>, client: SharedClient, config: Arc<HarnessConfig>) -> Self {
        let task_queue = format!(
            "{}-{}-{}",
            config.task_queue_prefix,
            feature.name().replace('/', "-"),
            &Uuid::new_v4().simple().to_string()[..8]
        );
        Self {
            feature,
            client,
            task_queue,
            config,
        }
    }

    /// The feature being run.
    pub fn feature(&self) -> &Feature {
        &self.feature
    }

    /// Client used for submission and delivery.
    pub fn client(&self) -> &SharedClient {
        &self.client
    }

    /// Task queue private to this feature.
    pub fn task_queue(&self) -> &str {
        &self.task_queue
    }

    /// Batch settings.
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Material an activity needs to open its own connection.
    pub fn connection_material(&self) -> ConnectionMaterial {
        self.config.connection.clone()
    }

    /// Directory holding the feature's source and fixtures.
    pub fn feature_dir(&self) -> Result<&Path> {
        self.feature
            .dir()
            .ok_or_else(|| HarnessError::InvalidFeature {
                name: self.feature.name().to_string(),
                reason: "feature has no directory".into(),
            })
    }

    /// The feature's start options with the task queue, a workflow id and
    /// the default execution timeout filled in.
    pub fn start_options(&self) -> StartWorkflowOptions {
        let mut options = self.feature.start_options().clone();
        if options.task_queue.is_empty() {
            options.task_queue = self.task_queue.clone();
        }
        if options.id.is_empty() {
            options.id = format!(
                "{}-{}",
                self.feature.name().replace('/', "-"),
                Uuid::new_v4()
            );
        }
        if options.execution_timeout.is_none() {
            options.execution_timeout = Some(self.config.execution_timeout);
        }
        options
    }

    /// Submit the feature's workflow with no arguments.
    pub async fn execute_default(&self) -> Result<WorkflowRun> {
        self.execute_with_args(Vec::new()).await
    }

    /// Submit the feature's workflow with `args`.
    pub async fn execute_with_args(&self, args: Payloads) -> Result<WorkflowRun> {
        let options = self.start_options();
        let execution = self
            .client
            .start_workflow(self.feature.workflow().name(), args, options)
            .await
            .map_err(HarnessError::Submission)?;
        debug!(
            feature = self.feature.name(),
            workflow_id = %execution.workflow_id,
            "Workflow submitted"
        );
        Ok(WorkflowRun::new(self.client.clone(), execution))
    }

    /// A skip outcome carrying `reason`.
    pub fn skip(&self, reason: impl Into<String>) -> HarnessError {
        HarnessError::Skipped(reason.into())
    }

    /// Skip unless the backend supports `capability`.
    pub async fn require_capability(&self, capability: Capability) -> Result<()> {
        let capabilities = self
            .client
            .capabilities()
            .await
            .map_err(HarnessError::Submission)?;
        if capabilities.supports(capability) {
            Ok(())
        } else {
            Err(self.skip(format!("server does not support {capability}")))
        }
    }

    /// Wait for the run and compare against the feature's expected result,
    /// or just require success when it has none.
    pub async fn check_default(&self, run: &WorkflowRun) -> Result<()> {
        let actual = self.wait_for_raw_result(run).await?;
        match self.feature.expected_result() {
            Some(expected) => check_scalar(expected, &actual),
            None => Ok(()),
        }
    }

    /// Wait for the run and decode its result.
    pub async fn wait_for_run_result<T: FromPayload>(&self, run: &WorkflowRun) -> Result<T> {
        let payload = self.wait_for_raw_result(run).await?;
        Ok(T::from_payload(&payload)?)
    }

    /// Wait for the run and return the payload exactly as stored.
    pub async fn wait_for_raw_result(&self, run: &WorkflowRun) -> Result<Payload> {
        run.get_raw().await.map_err(HarnessError::Run)
    }

    /// Fail with a mismatch unless `expected == actual`.
    pub fn require_eq<T: PartialEq + Debug>(&self, what: &str, expected: T, actual: T) -> Result<()> {
        if expected == actual {
            Ok(())
        } else {
            Err(HarnessError::Mismatch {
                what: what.to_string(),
                expected: format!("{expected:?}"),
                actual: format!("{actual:?}"),
            })
        }
    }
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("feature", &self.feature.name())
            .field("task_queue", &self.task_queue)
            .finish()
    }
}
