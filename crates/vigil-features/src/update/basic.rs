//! A validated update changes state the workflow is waiting on.

use futures::FutureExt;
use vigil_engine::{WorkflowContext, WorkflowDefinition};
use vigil_harness::{CustomCheck, DefaultExecution, Feature, Result, SkipUnless};
use vigil_types::{Capability, FromPayload, ToPayload};

use super::{State, UPDATE_RESULT, check_validated_update, reject_bad_arg};

pub const NAME: &str = "update/basic";
pub const UPDATE_NAME: &str = "myUpdate";

pub fn workflow() -> WorkflowDefinition {
    WorkflowDefinition::typed("UpdateBasic", |ctx: WorkflowContext, (): ()| async move {
        let state = State::default();
        {
            let state = state.clone();
            ctx.set_update_handler_with_validator(
                UPDATE_NAME,
                move |args| {
                    let state = state.clone();
                    async move {
                        *state.borrow_mut() = String::from_arg(&args, 0)?;
                        Ok(UPDATE_RESULT.to_payload()?)
                    }
                },
                reject_bad_arg,
            );
        }
        let waiting = state.clone();
        ctx.wait_condition(move || !waiting.borrow().is_empty()).await;
        let result = state.borrow().clone();
        Ok(result)
    })
}

pub fn feature() -> Result<Feature> {
    Feature::builder(NAME, workflow())
        .execute(SkipUnless::new(Capability::Updates, DefaultExecution))
        .check(CustomCheck::new(|runner, run| {
            check_validated_update(runner, run, UPDATE_NAME).boxed()
        }))
        .build()
}
