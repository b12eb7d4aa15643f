//! Deterministic in-process workflow engine for the Vigil conformance harness.
//!
//! Workflows are plain async functions over a [`WorkflowContext`]. The engine
//! records every input a run consumes and re-executes the workflow from its
//! history on every workflow task, checking that the code issues the same
//! commands each time. Activities run on tokio with per-attempt timeouts and
//! retry policies.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  Engine                                                    │
//! │  - Workers: task queue -> workflow/activity definitions    │
//! │  - Runs: history + status behind one lock per run          │
//! │  - Driver: replays history, compares recorded commands     │
//! │  - Activities: tokio tasks with timeout + retry policy     │
//! └────────────────────────────────────────────────────────────┘
//!            ▲                               ▲
//!      LocalClient                     LocalNetwork
//!   (EngineClient impl)           (Dialer for activities)
//! ```

pub mod activity;
pub mod definition;
pub mod engine;
pub mod error;
pub mod history;
pub mod local;
pub mod worker;
pub mod workflow;

pub use activity::{ActivityContext, ActivityInfo};
pub use definition::{ActivityDefinition, WorkflowDefinition, WorkflowResult};
pub use engine::{Engine, EngineConfig, RunStatus, replay_history};
pub use error::{ActivityError, EngineError, Result, WorkflowError};
pub use history::{Command, HistoryEvent, activity_attempts};
pub use local::{LocalClient, LocalNetwork};
pub use worker::{Worker, WorkerHandle};
pub use workflow::{
    Accumulator, ActivityFuture, Selected, Selector, SignalChannel, TimerFuture, WorkflowContext,
    WorkflowEvent, WorkflowInfo, sum,
};
