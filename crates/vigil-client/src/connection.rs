//! Dialing the engine from connection material.
//!
//! A [`Connection`] owns one live client plus a release hook. The hook runs
//! exactly once: on [`Connection::close`] or when the connection is dropped,
//! so an activity that bails out with `?` still releases what it opened.

use std::ops::Deref;
use std::path::Path;

use async_trait::async_trait;
use tracing::debug;
use vigil_types::ConnectionMaterial;

use crate::client::{EngineClient, SharedClient};
use crate::error::{ClientError, Result};

/// Opens connections to an engine.
#[async_trait]
pub trait Dialer: Send + Sync {
    /// Open one connection described by `material`.
    async fn dial(&self, material: &ConnectionMaterial) -> Result<Connection>;
}

type ReleaseFn = Box<dyn FnOnce() + Send + Sync>;

/// A live, exclusively owned connection.
pub struct Connection {
    client: SharedClient,
    on_release: Option<ReleaseFn>,
}

impl Connection {
    /// Wrap a client with a hook that runs when the connection is released.
    pub fn new(client: SharedClient, on_release: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            client,
            on_release: Some(Box::new(on_release)),
        }
    }

    /// The client carried by this connection.
    pub fn client(&self) -> &SharedClient {
        &self.client
    }

    /// Release the connection explicitly.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(hook) = self.on_release.take() {
            debug!(namespace = self.client.namespace(), "Connection released");
            hook();
        }
    }
}

impl Deref for Connection {
    type Target = dyn EngineClient;

    fn deref(&self) -> &Self::Target {
        self.client.as_ref()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("namespace", &self.client.namespace())
            .field("identity", &self.client.identity())
            .field("open", &self.on_release.is_some())
            .finish()
    }
}

/// Client credentials read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// PEM-encoded certificate chain.
    pub cert_pem: Vec<u8>,
    /// PEM-encoded private key.
    pub key_pem: Vec<u8>,
}

/// Load the mutual-TLS credentials named by `material`, if any.
///
/// Certificate and key must be supplied together.
pub fn load_credentials(material: &ConnectionMaterial) -> Result<Option<Credentials>> {
    match (&material.client_cert_path, &material.client_key_path) {
        (None, None) => Ok(None),
        (Some(cert), Some(key)) => Ok(Some(Credentials {
            cert_pem: read_pem(cert)?,
            key_pem: read_pem(key)?,
        })),
        (Some(_), None) => Err(ClientError::InvalidArgument(
            "client certificate given without a client key".into(),
        )),
        (None, Some(_)) => Err(ClientError::InvalidArgument(
            "client key given without a client certificate".into(),
        )),
    }
}

fn read_pem(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        ClientError::Connection(format!("failed to read '{}': {e}", path.display()))
    })
}
