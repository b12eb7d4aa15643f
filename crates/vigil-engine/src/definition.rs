//! Workflow and activity definitions.
//!
//! Definitions are type-erased function objects keyed by name. The typed
//! constructors decode the first argument with [`FromPayload`] and encode the
//! return value with [`ToPayload`], so scenario code works with native values.

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, LocalBoxFuture};
use vigil_types::{FromPayload, Payload, Payloads, ToPayload};

use crate::activity::ActivityContext;
use crate::error::{ActivityError, WorkflowError};
use crate::workflow::WorkflowContext;

/// Result type for workflow code.
pub type WorkflowResult<T> = std::result::Result<T, WorkflowError>;

/// Type-erased workflow entry point.
///
/// The returned future is polled on a single thread and never leaves the
/// workflow task that created it, so it need not be `Send`.
pub type WorkflowFn = Arc<
    dyn Fn(WorkflowContext, Payloads) -> LocalBoxFuture<'static, WorkflowResult<Payload>>
        + Send
        + Sync,
>;

/// Type-erased activity entry point.
pub type ActivityFn = Arc<
    dyn Fn(ActivityContext, Payloads) -> BoxFuture<'static, Result<Payload, ActivityError>>
        + Send
        + Sync,
>;

/// A named workflow entry point.
#[derive(Clone)]
pub struct WorkflowDefinition {
    name: String,
    func: WorkflowFn,
}

impl WorkflowDefinition {
    /// Define a workflow over raw payloads.
    pub fn new<F, Fut>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(WorkflowContext, Payloads) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = WorkflowResult<Payload>> + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(move |ctx, args| func(ctx, args).boxed_local()),
        }
    }

    /// Define a workflow taking one decoded input and returning an encodable output.
    pub fn typed<I, O, F, Fut>(name: impl Into<String>, func: F) -> Self
    where
        I: FromPayload + 'static,
        O: ToPayload + 'static,
        F: Fn(WorkflowContext, I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = WorkflowResult<O>> + 'static,
    {
        Self::new(name, move |ctx, args| {
            let started = I::from_arg(&args, 0).map(|input| func(ctx, input));
            async move {
                let output = started?.await?;
                Ok(output.to_payload()?)
            }
        })
    }

    /// Workflow type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn start(
        &self,
        ctx: WorkflowContext,
        args: Payloads,
    ) -> LocalBoxFuture<'static, WorkflowResult<Payload>> {
        (self.func)(ctx, args)
    }
}

impl std::fmt::Debug for WorkflowDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowDefinition")
            .field("name", &self.name)
            .finish()
    }
}

/// A named activity entry point.
#[derive(Clone)]
pub struct ActivityDefinition {
    name: String,
    func: ActivityFn,
}

impl ActivityDefinition {
    /// Define an activity over raw payloads.
    pub fn new<F, Fut>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(ActivityContext, Payloads) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Payload, ActivityError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(move |ctx, args| func(ctx, args).boxed()),
        }
    }

    /// Define an activity taking one decoded input and returning an encodable output.
    pub fn typed<I, O, F, Fut>(name: impl Into<String>, func: F) -> Self
    where
        I: FromPayload + Send + 'static,
        O: ToPayload + 'static,
        F: Fn(ActivityContext, I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, ActivityError>> + Send + 'static,
    {
        Self::new(name, move |ctx, args| {
            let started = I::from_arg(&args, 0).map(|input| func(ctx, input));
            async move {
                let output = started?.await?;
                Ok(output.to_payload()?)
            }
        })
    }

    /// Activity type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn invoke(
        &self,
        ctx: ActivityContext,
        args: Payloads,
    ) -> BoxFuture<'static, Result<Payload, ActivityError>> {
        (self.func)(ctx, args)
    }
}

impl std::fmt::Debug for ActivityDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityDefinition")
            .field("name", &self.name)
            .finish()
    }
}
