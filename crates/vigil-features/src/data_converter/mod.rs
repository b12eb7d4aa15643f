//! Data converter scenarios.

pub mod binary;
