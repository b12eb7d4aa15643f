//! Update scenarios.
//!
//! Every scenario here needs update support from the backend and is skipped
//! when it is missing.

use std::cell::RefCell;
use std::rc::Rc;

use vigil_client::WorkflowRun;
use vigil_engine::WorkflowError;
use vigil_harness::{HarnessError, Result, Runner};
use vigil_types::{FromPayload, Payloads, ToPayload, UpdateEnvelope};

pub mod basic;
pub mod basic_async;
pub mod self_update;

/// Argument the validators reject.
pub const BAD_UPDATE_ARG: &str = "reject-me";
/// Argument the validators accept.
pub const UPDATE_ARG: &str = "update-arg";
/// Value a successful update handler returns.
pub const UPDATE_RESULT: &str = "update-result";

/// Workflow state shared between the main body and its update handler.
pub(crate) type State = Rc<RefCell<String>>;

pub(crate) fn reject_bad_arg(args: &Payloads) -> std::result::Result<(), WorkflowError> {
    if String::from_arg(args, 0)? == BAD_UPDATE_ARG {
        return Err(WorkflowError::application(
            "InvalidArgument",
            "Invalid Update argument",
        ));
    }
    Ok(())
}

/// Send a rejected update, then an accepted one, then require the run to
/// finish with the accepted argument.
pub(crate) async fn check_validated_update(
    runner: &Runner,
    run: &WorkflowRun,
    update_name: &str,
) -> Result<()> {
    let bad = UpdateEnvelope::new(update_name).with_arg(BAD_UPDATE_ARG.to_payload()?);
    match run.update(bad).await {
        Err(err) if err.failure().is_some() => {}
        Err(err) => return Err(HarnessError::Delivery(err)),
        Ok(result) => {
            return Err(HarnessError::mismatch(
                "rejected update",
                "validation failure",
                result,
            ));
        }
    }

    let good = UpdateEnvelope::new(update_name).with_arg(UPDATE_ARG.to_payload()?);
    let result: String = run.update_as(good).await.map_err(HarnessError::Delivery)?;
    runner.require_eq("update result", UPDATE_RESULT, result.as_str())?;

    let final_state: String = runner.wait_for_run_result(run).await?;
    runner.require_eq("workflow result", UPDATE_ARG, final_state.as_str())
}
