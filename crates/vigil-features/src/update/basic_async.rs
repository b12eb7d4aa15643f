//! Like `update/basic`, but the handler suspends on a timer before it
//! changes state.

use std::time::Duration;

use futures::FutureExt;
use vigil_engine::{WorkflowContext, WorkflowDefinition};
use vigil_harness::{CustomCheck, DefaultExecution, Feature, Result, SkipUnless};
use vigil_types::{Capability, FromPayload, ToPayload};

use super::{State, UPDATE_RESULT, check_validated_update, reject_bad_arg};

pub const NAME: &str = "update/basic_async";
pub const UPDATE_NAME: &str = "my_update";

pub fn workflow() -> WorkflowDefinition {
    WorkflowDefinition::typed("UpdateBasicAsync", |ctx: WorkflowContext, (): ()| async move {
        let state = State::default();
        {
            let state = state.clone();
            let timers = ctx.clone();
            ctx.set_update_handler_with_validator(
                UPDATE_NAME,
                move |args| {
                    let state = state.clone();
                    let timers = timers.clone();
                    async move {
                        let arg = String::from_arg(&args, 0)?;
                        timers.sleep(Duration::from_millis(10)).await;
                        *state.borrow_mut() = arg;
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
