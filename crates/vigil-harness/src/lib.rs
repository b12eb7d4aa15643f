//! Conformance harness for the Vigil workflow engine.
//!
//! A [`Feature`] describes one scenario: a workflow, its activities, how to
//! launch it ([`ExecutionStrategy`]) and how to judge the outcome
//! ([`ResultChecker`]). The [`Harness`] runs a batch of features, each on
//! its own task queue, and produces a [`RunSummary`].
//!
//! ```text
//!  Feature ──► Harness ──► Runner ──► ExecutionStrategy ──► WorkflowRun
//!                 │                                            │
//!                 │                         ResultChecker ◄────┘
//!                 ▼                               │
//!             RunSummary ◄── FeatureReport ◄──────┘ (+ replay check)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use vigil_engine::{Engine, EngineConfig, WorkflowContext, WorkflowDefinition};
//! use vigil_harness::{Feature, Harness, HarnessConfig};
//!
//! # async fn example() -> vigil_harness::Result<()> {
//! let workflow = WorkflowDefinition::typed("Hello", |_ctx: WorkflowContext, (): ()| async {
//!     Ok("hello".to_string())
//! });
//! let feature = Feature::builder("hello/basic", workflow)
//!     .expect_result("hello")
//!     .build()?;
//!
//! let harness = Harness::new(Engine::new(EngineConfig::default()), HarnessConfig::default());
//! let summary = harness.run(vec![feature]).await;
//! assert!(summary.success());
//! # Ok(())
//! # }
//! ```

pub mod checker;
pub mod codec;
pub mod error;
pub mod execution;
pub mod feature;
pub mod harness;
pub mod report;
pub mod runner;

pub use checker::{
    AllOf, CheckDefault, CheckFn, CustomCheck, PayloadFixture, ResultChecker, ScalarEquality,
};
pub use codec::{
    PayloadDifference, compare_payloads, load_fixture, verify_against_fixture, verify_payload,
};
pub use error::{HarnessError, Result};
pub use execution::{
    CustomExecution, DefaultExecution, ExecuteFn, ExecutionStrategy, SignalAfterStart,
    SkipUnless, UpdateAfterStart, UpdateExpectation,
};
pub use feature::{Feature, FeatureBuilder};
pub use harness::Harness;
pub use report::{FeatureReport, Outcome, RunSummary};
pub use runner::{HarnessConfig, Runner};
