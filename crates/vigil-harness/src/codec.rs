//! Payload codec verification.
//!
//! Compares the raw result payload the engine stored against a fixture on
//! disk. Fixtures use the engine's protobuf-JSON form:
//!
//! ```json
//! {"metadata":{"encoding":"YmluYXJ5L3BsYWlu"},"data":"3q2+7w=="}
//! ```
//!
//! Metadata must match exactly. Data is compared structurally when both
//! sides are `json/plain` (whitespace and key order do not matter) and
//! byte-for-byte otherwise.

use std::fmt;
use std::path::Path;

use vigil_types::Payload;

use crate::error::{HarnessError, Result};

/// Why two payloads differ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadDifference {
    /// Metadata maps differ.
    Metadata,
    /// JSON documents differ in value.
    Structure,
    /// Byte contents differ.
    Bytes {
        /// First differing offset, or the shorter length.
        offset: usize,
    },
}

impl fmt::Display for PayloadDifference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadDifference::Metadata => f.write_str("metadata differs"),
            PayloadDifference::Structure => f.write_str("JSON value differs"),
            PayloadDifference::Bytes { offset } => write!(f, "bytes differ at offset {offset}"),
        }
    }
}

/// Load an expected payload fixture.
pub fn load_fixture(path: &Path) -> Result<Payload> {
    let contents = std::fs::read_to_string(path).map_err(|e| HarnessError::FixtureLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&contents).map_err(|e| HarnessError::FixtureLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Compare two payloads; `None` when they are equivalent.
pub fn compare_payloads(expected: &Payload, actual: &Payload) -> Option<PayloadDifference> {
    if expected.metadata != actual.metadata {
        return Some(PayloadDifference::Metadata);
    }
    if expected.is_self_describing() {
        let parsed = (
            serde_json::from_slice::<serde_json::Value>(&expected.data),
            serde_json::from_slice::<serde_json::Value>(&actual.data),
        );
        if let (Ok(left), Ok(right)) = parsed {
            return (left != right).then_some(PayloadDifference::Structure);
        }
    }
    if expected.data == actual.data {
        return None;
    }
    let offset = expected
        .data
        .iter()
        .zip(&actual.data)
        .position(|(a, b)| a != b)
        .unwrap_or_else(|| expected.data.len().min(actual.data.len()));
    Some(PayloadDifference::Bytes { offset })
}

/// Verify `actual` against `expected`, reporting both on mismatch.
pub fn verify_payload(expected: &Payload, actual: &Payload) -> Result<()> {
    match compare_payloads(expected, actual) {
        None => Ok(()),
        Some(difference) => Err(HarnessError::mismatch(
            format!("result payload ({difference})"),
            expected,
            actual,
        )),
    }
}

/// Verify `actual` against the fixture at `path`.
pub fn verify_against_fixture(path: &Path, actual: &Payload) -> Result<()> {
    let expected = load_fixture(path)?;
    verify_payload(&expected, actual)
}
