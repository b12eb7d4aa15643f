//! Run identities, stimulus envelopes and connection material.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::payload::{Payload, Payloads};

/// Identifies one run of a submitted workflow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkflowExecution {
    /// Namespace the run lives in.
    pub namespace: String,
    /// Caller-chosen workflow id.
    pub workflow_id: String,
    /// Engine-assigned run id.
    pub run_id: String,
}

impl fmt::Display for WorkflowExecution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.namespace, self.workflow_id, self.run_id)
    }
}

/// A fire-and-forget signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalEnvelope {
    /// Signal name the workflow listens on.
    pub name: String,
    /// Optional payload.
    pub payload: Option<Payload>,
}

impl SignalEnvelope {
    /// Signal without a payload.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: None,
        }
    }

    /// Attach a payload.
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// An update request; the sender always awaits a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateEnvelope {
    /// Handler name.
    pub name: String,
    /// Handler arguments.
    pub args: Payloads,
}

impl UpdateEnvelope {
    /// Update without arguments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Append an argument.
    pub fn with_arg(mut self, arg: Payload) -> Self {
        self.args.push(arg);
        self
    }
}

/// Everything an activity needs to dial the engine on its own.
///
/// Passed by value into the activity's input; the activity owns whatever
/// connection it opens with it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectionMaterial {
    /// Engine endpoint (host:port or in-process name).
    pub endpoint: String,
    /// Namespace to bind the connection to.
    pub namespace: String,
    /// Client identity reported to the engine.
    pub identity: String,
    /// Client certificate path for mutual TLS.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_cert_path: Option<PathBuf>,
    /// Client key path for mutual TLS.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_key_path: Option<PathBuf>,
}

impl ConnectionMaterial {
    /// Material for a plaintext connection.
    pub fn new(
        endpoint: impl Into<String>,
        namespace: impl Into<String>,
        identity: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            namespace: namespace.into(),
            identity: identity.into(),
            client_cert_path: None,
            client_key_path: None,
        }
    }

    /// Whether mutual TLS credentials were supplied.
    pub fn has_credentials(&self) -> bool {
        self.client_cert_path.is_some() || self.client_key_path.is_some()
    }
}
