//! Shared types for the Vigil conformance harness.
//!
//! Everything that crosses the boundary between the harness, the engine
//! client and the engine itself lives here: wire payloads and the data
//! converter that produces them, failures, run identities, signal/update
//! envelopes, connection material and submission options.

pub mod capability;
pub mod converter;
pub mod error;
pub mod execution;
pub mod failure;
pub mod options;
pub mod payload;

pub use capability::{Capabilities, Capability};
pub use converter::{FromPayload, Json, ToPayload, encode_args};
pub use error::{ConverterError, Result};
pub use execution::{ConnectionMaterial, SignalEnvelope, UpdateEnvelope, WorkflowExecution};
pub use failure::Failure;
pub use options::{ActivityOptions, RetryPolicy, StartWorkflowOptions};
pub use payload::{Payload, Payloads, encoding};
