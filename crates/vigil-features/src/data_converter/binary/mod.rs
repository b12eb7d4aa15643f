//! Raw bytes must be stored as `binary/plain` with the bytes untouched.
//!
//! The expected payload lives next to this file in `payload.json`.

use vigil_engine::{WorkflowContext, WorkflowDefinition};
use vigil_harness::{AllOf, Feature, PayloadFixture, Result, ScalarEquality};

pub const NAME: &str = "data_converter/binary";
pub const EXPECTED: [u8; 4] = [0xde, 0xad, 0xbe, 0xef];

const DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/src/data_converter/binary");

pub fn workflow() -> WorkflowDefinition {
    WorkflowDefinition::typed("BinaryPayload", |_ctx: WorkflowContext, (): ()| async {
        Ok(EXPECTED.to_vec())
    })
}

pub fn feature() -> Result<Feature> {
    Feature::builder(NAME, workflow())
        .dir(DIR)
        .check(
            AllOf::new()
                .and(ScalarEquality::of(EXPECTED.to_vec())?)
                .and(PayloadFixture::new("payload.json")),
        )
        .build()
}
