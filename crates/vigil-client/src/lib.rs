//! Engine client contract for the Vigil conformance harness.
//!
//! The harness never talks to an engine directly. It holds a
//! [`SharedClient`] (an `Arc<dyn EngineClient>`) and wraps each submitted run
//! in a [`WorkflowRun`]. Activities that need to call back into the engine
//! receive a [`Dialer`] and open their own scoped [`Connection`].
//!
//! # Example
//!
//! ```no_run
//! use vigil_client::{SharedClient, WorkflowRun};
//! use vigil_types::{SignalEnvelope, StartWorkflowOptions, ToPayload};
//!
//! # async fn example(client: SharedClient) -> vigil_client::Result<()> {
//! let execution = client
//!     .start_workflow("SignalWorkflow", vec![], StartWorkflowOptions::default())
//!     .await?;
//! let run = WorkflowRun::new(client.clone(), execution);
//! run.signal(SignalEnvelope::new("mySignal").with_payload("signal-data".to_payload()?))
//!     .await?;
//! let result: String = run.get().await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod connection;
pub mod error;

pub use client::{EngineClient, SharedClient, WorkflowRun};
pub use connection::{Connection, Credentials, Dialer, load_credentials};
pub use error::{ClientError, Result};
