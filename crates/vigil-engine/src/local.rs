//! In-process client and network.
//!
//! [`LocalClient`] adapts an [`Engine`] to the [`EngineClient`] contract.
//! [`LocalNetwork`] maps endpoints to engines so activities can dial back
//! into the engine that is running them, exactly as they would dial a
//! remote service.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;
use vigil_client::{
    ClientError, Connection, Dialer, EngineClient, Result as ClientResult, load_credentials,
};
use vigil_types::{
    Capabilities, ConnectionMaterial, Payload, Payloads, SignalEnvelope, StartWorkflowOptions,
    UpdateEnvelope, WorkflowExecution,
};

use crate::engine::{Engine, EngineInner};

/// [`EngineClient`] backed by an in-process [`Engine`].
#[derive(Debug, Clone)]
pub struct LocalClient {
    engine: Engine,
    identity: String,
}

impl LocalClient {
    /// Client for `engine` reporting `identity`.
    pub fn new(engine: Engine, identity: impl Into<String>) -> Self {
        Self {
            engine,
            identity: identity.into(),
        }
    }

    /// The engine behind this client.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }
}

#[async_trait]
impl EngineClient for LocalClient {
    fn namespace(&self) -> &str {
        self.engine.namespace()
    }

    fn identity(&self) -> &str {
        &self.identity
    }

    async fn start_workflow(
        &self,
        workflow_type: &str,
        args: Payloads,
        options: StartWorkflowOptions,
    ) -> ClientResult<WorkflowExecution> {
        self.engine.start_workflow(workflow_type, args, options)
    }

    async fn signal_workflow(
        &self,
        execution: &WorkflowExecution,
        signal: SignalEnvelope,
    ) -> ClientResult<()> {
        self.engine.signal(execution, signal)
    }

    async fn update_workflow(
        &self,
        execution: &WorkflowExecution,
        update: UpdateEnvelope,
    ) -> ClientResult<Payload> {
        self.engine.update(execution, update).await
    }

    async fn capabilities(&self) -> ClientResult<Capabilities> {
        Ok(self.engine.capabilities())
    }

    async fn result_payload(&self, execution: &WorkflowExecution) -> ClientResult<Option<Payload>> {
        self.engine.result_payload(execution)
    }

    async fn wait_for_result(&self, execution: &WorkflowExecution) -> ClientResult<Payload> {
        self.engine.wait_for_result(execution).await
    }
}

#[derive(Default)]
struct NetworkInner {
    engines: RwLock<HashMap<String, Weak<EngineInner>>>,
    live: AtomicUsize,
    opened: AtomicUsize,
}

/// Routes dialed endpoints to in-process engines.
#[derive(Clone, Default)]
pub struct LocalNetwork {
    inner: Arc<NetworkInner>,
}

impl LocalNetwork {
    /// Empty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `engine` at `endpoint` and let its activities dial this network.
    pub fn register(&self, endpoint: impl Into<String>, engine: &Engine) {
        let endpoint = endpoint.into();
        debug!(endpoint = %endpoint, namespace = engine.namespace(), "Endpoint registered");
        self.inner
            .engines
            .write()
            .insert(endpoint, engine.downgrade());
        engine.set_dialer(Arc::new(self.clone()));
    }

    /// Connections currently open.
    pub fn live_connections(&self) -> usize {
        self.inner.live.load(Ordering::SeqCst)
    }

    /// Connections opened since the network was created.
    pub fn connections_opened(&self) -> usize {
        self.inner.opened.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for LocalNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalNetwork")
            .field("endpoints", &self.inner.engines.read().len())
            .field("live_connections", &self.live_connections())
            .finish()
    }
}

#[async_trait]
impl Dialer for LocalNetwork {
    async fn dial(&self, material: &ConnectionMaterial) -> ClientResult<Connection> {
        load_credentials(material)?;

        let weak = self
            .inner
            .engines
            .read()
            .get(&material.endpoint)
            .cloned()
            .ok_or_else(|| ClientError::Connection(format!("no route to '{}'", material.endpoint)))?;
        let engine = Engine::upgrade(&weak).ok_or_else(|| {
            ClientError::Connection(format!("engine at '{}' has shut down", material.endpoint))
        })?;
        if engine.namespace() != material.namespace {
            return Err(ClientError::NotFound(format!(
                "namespace '{}'",
                material.namespace
            )));
        }

        self.inner.live.fetch_add(1, Ordering::SeqCst);
        self.inner.opened.fetch_add(1, Ordering::SeqCst);
        debug!(
            endpoint = %material.endpoint,
            identity = %material.identity,
            "Connection opened"
        );
        let network = self.inner.clone();
        Ok(Connection::new(
            Arc::new(engine.client(material.identity.clone())),
            move || {
                network.live.fetch_sub(1, Ordering::SeqCst);
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;

    #[tokio::test]
    async fn test_dial_registered_endpoint() {
        let engine = Engine::new(EngineConfig::default());
        let network = LocalNetwork::new();
        network.register("localhost:7233", &engine);

        let material = ConnectionMaterial::new("localhost:7233", "default", "activity");
        let connection = network.dial(&material).await.unwrap();
        assert_eq!(connection.identity(), "activity");
        assert_eq!(network.live_connections(), 1);

        connection.close();
        assert_eq!(network.live_connections(), 0);
        assert_eq!(network.connections_opened(), 1);
    }

    #[tokio::test]
    async fn test_dial_unknown_endpoint() {
        let network = LocalNetwork::new();
        let material = ConnectionMaterial::new("nowhere:1", "default", "activity");
        let err = network.dial(&material).await.unwrap_err();
        assert_eq!(err.error_type(), "Unavailable");
    }

    #[tokio::test]
    async fn test_dial_wrong_namespace() {
        let engine = Engine::new(EngineConfig::default());
        let network = LocalNetwork::new();
        network.register("localhost:7233", &engine);
        let material = ConnectionMaterial::new("localhost:7233", "elsewhere", "activity");
        assert!(network.dial(&material).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_dropped_engine_is_unreachable() {
        let network = LocalNetwork::new();
        {
            let engine = Engine::new(EngineConfig::default());
            network.register("localhost:7233", &engine);
        }
        let material = ConnectionMaterial::new("localhost:7233", "default", "activity");
        let err = network.dial(&material).await.unwrap_err();
        assert!(matches!(err, ClientError::Connection(_)));
    }
}
