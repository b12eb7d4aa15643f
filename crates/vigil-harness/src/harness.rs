//! Batch execution.
//!
//! The harness runs features against an engine, a bounded number at a
//! time. Each feature gets its own task queue and worker; one feature's
//! failure, skip or timeout never affects the others.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use vigil_client::SharedClient;
use vigil_engine::{Engine, EngineError};

use crate::error::{HarnessError, Result};
use crate::feature::Feature;
use crate::report::{FeatureReport, Outcome, RunSummary};
use crate::runner::{HarnessConfig, Runner};

/// Runs features against one engine.
#[derive(Clone)]
pub struct Harness {
    engine: Engine,
    client: SharedClient,
    config: Arc<HarnessConfig>,
    cancel: CancellationToken,
}

impl Harness {
    /// Harness using `engine` for workers and an in-process client for submission.
    pub fn new(engine: Engine, config: HarnessConfig) -> Self {
        let client: SharedClient = Arc::new(engine.client(config.connection.identity.clone()));
        Self::with_client(engine, client, config)
    }

    /// Harness submitting through `client`.
    pub fn with_client(engine: Engine, client: SharedClient, config: HarnessConfig) -> Self {
        Self {
            engine,
            client,
            config: Arc::new(config),
            cancel: CancellationToken::new(),
        }
    }

    /// Token that aborts features still in flight.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Batch settings.
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run every feature and collect their reports in input order.
    pub async fn run(&self, features: Vec<Feature>) -> RunSummary {
        let started_at = Utc::now();
        info!(
            features = features.len(),
            concurrency = self.config.concurrency,
            "Starting feature run"
        );

        let reports: Vec<FeatureReport> = futures::stream::iter(features)
            .map(|feature| self.run_feature(Arc::new(feature)))
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        let summary = RunSummary {
            started_at,
            finished_at: Utc::now(),
            reports,
        };
        info!(
            passed = summary.passed(),
            failed = summary.failed(),
            skipped = summary.skipped(),
            "Feature run finished"
        );
        summary
    }

    /// Run one feature to a report.
    pub async fn run_feature(&self, feature: Arc<Feature>) -> FeatureReport {
        let runner = Runner::new(feature.clone(), self.client.clone(), self.config.clone());
        let started_at = Utc::now();
        let clock = Instant::now();

        let result = tokio::select! {
            _ = self.cancel.cancelled() => Err(HarnessError::Cancelled),
            outcome = tokio::time::timeout(self.config.feature_timeout, self.drive(&runner)) => {
                outcome.unwrap_or(Err(HarnessError::Timeout(self.config.feature_timeout)))
            }
        };

        let outcome = Outcome::from_result(&result);
        match &outcome {
            Outcome::Passed => info!(feature = feature.name(), "Feature passed"),
            Outcome::Skipped { reason } => info!(feature = feature.name(), %reason, "Feature skipped"),
            Outcome::Failed { error } => warn!(feature = feature.name(), %error, "Feature failed"),
        }

        FeatureReport {
            name: feature.name().to_string(),
            task_queue: runner.task_queue().to_string(),
            outcome,
            started_at,
            duration_ms: u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX),
        }
    }

    async fn drive(&self, runner: &Runner) -> Result<()> {
        let feature = runner.feature();
        let _worker = self
            .engine
            .start_worker(feature.worker(runner.task_queue()))?;

        let run = feature.execution().execute(runner).await?;
        feature.checker().check(runner, &run).await?;

        if self.config.replay_check {
            match self.engine.replay(run.execution()) {
                Ok(()) | Err(EngineError::RunOpen(_)) => {}
                Err(EngineError::Nondeterminism(detail)) => {
                    return Err(HarnessError::Replay(detail));
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Harness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Harness")
            .field("namespace", &self.engine.namespace())
            .field("config", &self.config)
            .finish()
    }
}
