//! Conformance scenarios for the Vigil harness.
//!
//! Each module exposes a `feature()` constructor; [`all`] lists every
//! scenario in a fixed order. Scenario names mirror the module path, so
//! `signal::basic` runs as `signal/basic`.

pub mod data_converter;
pub mod signal;
pub mod update;

use vigil_harness::{Feature, Result};

/// Every scenario, in the order they are reported.
pub fn all() -> Result<Vec<Feature>> {
    Ok(vec![
        data_converter::binary::feature()?,
        signal::activities::feature()?,
        signal::basic::feature()?,
        update::basic::feature()?,
        update::basic_async::feature()?,
        update::self_update::feature()?,
    ])
}

/// Scenarios whose name contains `pattern`.
pub fn matching(pattern: &str) -> Result<Vec<Feature>> {
    Ok(all()?
        .into_iter()
        .filter(|feature| feature.name().contains(pattern))
        .collect())
}
