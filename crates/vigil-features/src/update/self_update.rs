//! An activity dials the engine with the material it was handed and sends
//! an update to its own workflow.
//!
//! Backends without update support answer `PermissionDenied`, which the
//! activity's retry policy treats as final.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use futures::FutureExt;
use tracing::debug;
use vigil_engine::{
    ActivityContext, ActivityDefinition, ActivityError, WorkflowContext, WorkflowDefinition,
    WorkflowError,
};
use vigil_harness::{CustomExecution, Feature, Result, SkipUnless};
use vigil_types::{
    ActivityOptions, Capability, ConnectionMaterial, Json, Payload, RetryPolicy, ToPayload,
    UpdateEnvelope,
};

use super::State;

pub const NAME: &str = "update/self";
pub const UPDATE_NAME: &str = "update!";
pub const EXPECTED_STATE: &str = "called";

const ACTIVITY: &str = "SelfUpdateActivity";
const UPDATE_NOT_ENABLED_ERROR_TYPE: &str = "PermissionDenied";

pub fn activity() -> ActivityDefinition {
    ActivityDefinition::typed(
        ACTIVITY,
        |ctx: ActivityContext, Json(material): Json<ConnectionMaterial>| async move {
            let connection = ctx.connect(&material).await?;
            let execution = ctx.info().workflow_execution.clone();
            debug!(workflow_id = %execution.workflow_id, "Sending self update");
            connection
                .update_workflow(&execution, UpdateEnvelope::new(UPDATE_NAME))
                .await?;
            connection.close();
            Ok::<_, ActivityError>(())
        },
    )
}

pub fn workflow() -> WorkflowDefinition {
    WorkflowDefinition::new("SelfUpdate", |ctx: WorkflowContext, args| async move {
        let state: State = Rc::new(RefCell::new(format!("not {EXPECTED_STATE}")));
        {
            let state = state.clone();
            ctx.set_update_handler(UPDATE_NAME, move |_args| {
                let state = state.clone();
                async move {
                    *state.borrow_mut() = EXPECTED_STATE.to_string();
                    Ok(Payload::null())
                }
            });
        }

        let options = ActivityOptions::with_timeout(Duration::from_secs(5)).retry_policy(
            RetryPolicy {
                non_retryable_error_types: vec![UPDATE_NOT_ENABLED_ERROR_TYPE.to_string()],
                ..Default::default()
            },
        );
        ctx.execute_activity(ACTIVITY, args, options).await?;

        let state = state.borrow().clone();
        if state != EXPECTED_STATE {
            return Err(WorkflowError::application(
                "UnexpectedState",
                format!("expected state == {EXPECTED_STATE:?} but found {state:?}"),
            ));
        }
        Ok(state.to_payload()?)
    })
}

pub fn feature() -> Result<Feature> {
    let execution = CustomExecution::new(|runner| {
        let material = Json(runner.connection_material());
        async move {
            let args = vec![material.to_payload()?];
            runner.execute_with_args(args).await
        }
        .boxed()
    });
    Feature::builder(NAME, workflow())
        .activity(activity())
        .execute(SkipUnless::new(Capability::Updates, execution))
        .expect_result(EXPECTED_STATE)
        .build()
}
