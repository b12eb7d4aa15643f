//! A signal triggers a fan-out of activities whose results are summed.
//!
//! The workflow selects on the signal channel, schedules every activity
//! before awaiting any, then folds completions in whatever order they land.

use std::time::Duration;

use vigil_engine::{
    ActivityContext, ActivityDefinition, ActivityError, Selector, WorkflowContext,
    WorkflowDefinition, WorkflowEvent, sum,
};
use vigil_harness::{Feature, Result, SignalAfterStart};
use vigil_types::{ActivityOptions, FromPayload, SignalEnvelope};

use super::SIGNAL_NAME;

pub const NAME: &str = "signal/activities";
pub const ACTIVITY_COUNT: i64 = 5;
pub const ACTIVITY_RESULT: i64 = 6;

const ACTIVITY: &str = "SignalActivitiesActivity";

pub fn activity() -> ActivityDefinition {
    ActivityDefinition::typed(ACTIVITY, |_ctx: ActivityContext, (): ()| async {
        Ok::<_, ActivityError>(ACTIVITY_RESULT)
    })
}

pub fn workflow() -> WorkflowDefinition {
    WorkflowDefinition::typed("SignalActivities", |ctx: WorkflowContext, (): ()| async move {
        let channel = ctx.signal_channel(SIGNAL_NAME);
        Selector::new().on_signal(&channel).select().await?;

        let options = ActivityOptions::with_timeout(Duration::from_secs(5));
        let mut activities = Selector::new();
        for _ in 0..ACTIVITY_COUNT {
            activities =
                activities.on_activity(ctx.execute_activity(ACTIVITY, vec![], options.clone()));
        }

        let mut total = sum::<i64>();
        while activities.pending() > 0 {
            if let WorkflowEvent::ActivityDone { result, .. } = activities.select().await?.event {
                total = total.fold(i64::from_payload(&result?)?);
            }
        }
        Ok(total.into_inner())
    })
}

pub fn feature() -> Result<Feature> {
    Feature::builder(NAME, workflow())
        .activity(activity())
        .execute(SignalAfterStart::new(SignalEnvelope::new(SIGNAL_NAME)))
        .expect_result(ACTIVITY_RESULT * ACTIVITY_COUNT)
        .build()
}
