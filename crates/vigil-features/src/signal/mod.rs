//! Signal delivery scenarios.

pub mod activities;
pub mod basic;

/// Signal name shared by the signal scenarios.
pub const SIGNAL_NAME: &str = "mySignal";
