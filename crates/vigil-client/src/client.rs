//! The engine client contract and the run handle built on it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use vigil_types::{
    Capabilities, FromPayload, Payload, Payloads, SignalEnvelope, StartWorkflowOptions,
    UpdateEnvelope, WorkflowExecution,
};

use crate::error::{ClientError, Result};

/// Everything the harness (or a self-referential activity) may ask of an engine.
///
/// The engine behind this trait is a black box: implementations may talk to
/// a remote service or to an in-process simulation.
#[async_trait]
pub trait EngineClient: Send + Sync {
    /// Namespace this client is bound to.
    fn namespace(&self) -> &str;

    /// Identity reported with every request.
    fn identity(&self) -> &str;

    /// Submit a workflow run.
    async fn start_workflow(
        &self,
        workflow_type: &str,
        args: Payloads,
        options: StartWorkflowOptions,
    ) -> Result<WorkflowExecution>;

    /// Deliver a signal. Returns once the engine has accepted it.
    async fn signal_workflow(
        &self,
        execution: &WorkflowExecution,
        signal: SignalEnvelope,
    ) -> Result<()>;

    /// Deliver an update and wait for its handler to finish.
    async fn update_workflow(
        &self,
        execution: &WorkflowExecution,
        update: UpdateEnvelope,
    ) -> Result<Payload>;

    /// Report which features the backend supports.
    async fn capabilities(&self) -> Result<Capabilities>;

    /// Raw result payload of a closed run, as stored by the engine.
    ///
    /// `None` while the run is still open.
    async fn result_payload(&self, execution: &WorkflowExecution) -> Result<Option<Payload>>;

    /// Wait for the run to close and return its raw result payload.
    async fn wait_for_result(&self, execution: &WorkflowExecution) -> Result<Payload>;
}

/// Shared, type-erased client.
pub type SharedClient = Arc<dyn EngineClient>;

/// Handle to one submitted run.
#[derive(Clone)]
pub struct WorkflowRun {
    client: SharedClient,
    execution: WorkflowExecution,
}

impl WorkflowRun {
    /// Wrap an execution with the client that started it.
    pub fn new(client: SharedClient, execution: WorkflowExecution) -> Self {
        Self { client, execution }
    }

    /// Workflow id.
    pub fn id(&self) -> &str {
        &self.execution.workflow_id
    }

    /// Run id.
    pub fn run_id(&self) -> &str {
        &self.execution.run_id
    }

    /// Full run identity.
    pub fn execution(&self) -> &WorkflowExecution {
        &self.execution
    }

    /// Client the run was started with.
    pub fn client(&self) -> &SharedClient {
        &self.client
    }

    /// Wait for the result and decode it.
    pub async fn get<T: FromPayload>(&self) -> Result<T> {
        let payload = self.get_raw().await?;
        Ok(T::from_payload(&payload)?)
    }

    /// Wait for the result, giving up after `timeout`.
    pub async fn get_with_timeout<T: FromPayload>(&self, timeout: Duration) -> Result<T> {
        match tokio::time::timeout(timeout, self.get_raw()).await {
            Ok(result) => Ok(T::from_payload(&result?)?),
            Err(_) => Err(ClientError::Timeout(format!("result of {}", self.execution))),
        }
    }

    /// Wait for the result without decoding it.
    pub async fn get_raw(&self) -> Result<Payload> {
        self.client.wait_for_result(&self.execution).await
    }

    /// Send a signal to this run.
    pub async fn signal(&self, signal: SignalEnvelope) -> Result<()> {
        self.client.signal_workflow(&self.execution, signal).await
    }

    /// Send an update to this run and wait for the handler's result.
    pub async fn update(&self, update: UpdateEnvelope) -> Result<Payload> {
        self.client.update_workflow(&self.execution, update).await
    }

    /// Send an update and decode its result.
    pub async fn update_as<T: FromPayload>(&self, update: UpdateEnvelope) -> Result<T> {
        let payload = self.update(update).await?;
        Ok(T::from_payload(&payload)?)
    }
}

impl std::fmt::Debug for WorkflowRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowRun")
            .field("execution", &self.execution)
            .finish()
    }
}
