//! A signal sent after start becomes the workflow's result.

use vigil_engine::{WorkflowContext, WorkflowDefinition};
use vigil_harness::{Feature, Result, SignalAfterStart};
use vigil_types::{FromPayload, Payload, SignalEnvelope, ToPayload};

use super::SIGNAL_NAME;

pub const NAME: &str = "signal/basic";
pub const SIGNAL_DATA: &str = "signal-data";

pub fn workflow() -> WorkflowDefinition {
    WorkflowDefinition::typed("SignalBasic", |ctx: WorkflowContext, (): ()| async move {
        let payload = ctx.signal_channel(SIGNAL_NAME).recv().await;
        Ok(String::from_payload(&payload.unwrap_or_else(Payload::null))?)
    })
}

pub fn feature() -> Result<Feature> {
    let signal = SignalEnvelope::new(SIGNAL_NAME).with_payload(SIGNAL_DATA.to_payload()?);
    Feature::builder(NAME, workflow())
        .execute(SignalAfterStart::new(signal))
        .expect_result(SIGNAL_DATA)
        .build()
}
