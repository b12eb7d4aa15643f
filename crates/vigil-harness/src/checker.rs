//! Result checkers.
//!
//! A checker inspects a finished run. Checkers that compare the stored
//! payload byte-for-byte or load fixtures from the feature's directory
//! declare it, so inconsistent descriptors are rejected at build time.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use vigil_client::WorkflowRun;
use vigil_types::{Payload, ToPayload};

use crate::codec::verify_against_fixture;
use crate::error::{HarnessError, Result};
use crate::runner::Runner;

/// Verifies the outcome of a run.
#[async_trait]
pub trait ResultChecker: Send + Sync {
    /// Inspect `run`; an error means the feature failed.
    async fn check(&self, runner: &Runner, run: &WorkflowRun) -> Result<()>;

    /// Whether the check compares the exact stored result payload.
    fn requires_raw_payload(&self) -> bool {
        false
    }

    /// Whether the check reads files from the feature's directory.
    fn requires_feature_dir(&self) -> bool {
        false
    }
}

/// Compare two payloads by encoding, then by decoded value.
pub(crate) fn check_scalar(expected: &Payload, actual: &Payload) -> Result<()> {
    let (expected_encoding, actual_encoding) = (expected.encoding()?, actual.encoding()?);
    if expected_encoding != actual_encoding {
        return Err(HarnessError::mismatch(
            "workflow result encoding",
            expected_encoding,
            actual_encoding,
        ));
    }
    let expected = expected.to_json_value()?;
    let actual = actual.to_json_value()?;
    if expected == actual {
        Ok(())
    } else {
        Err(HarnessError::mismatch("workflow result", expected, actual))
    }
}

/// Require success, and equality with the feature's expected result if it has one.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckDefault;

#[async_trait]
impl ResultChecker for CheckDefault {
    async fn check(&self, runner: &Runner, run: &WorkflowRun) -> Result<()> {
        runner.check_default(run).await
    }
}

/// Require the result to decode to a given value.
#[derive(Debug, Clone)]
pub struct ScalarEquality {
    expected: Payload,
}

impl ScalarEquality {
    /// Compare against an already encoded payload.
    pub fn new(expected: Payload) -> Self {
        Self { expected }
    }

    /// Compare against `value` encoded with the default converter.
    pub fn of<T: ToPayload>(value: T) -> Result<Self> {
        Ok(Self::new(value.to_payload()?))
    }
}

#[async_trait]
impl ResultChecker for ScalarEquality {
    async fn check(&self, runner: &Runner, run: &WorkflowRun) -> Result<()> {
        let actual = runner.wait_for_raw_result(run).await?;
        check_scalar(&self.expected, &actual)
    }
}

/// Require the stored result payload to match a JSON fixture exactly.
#[derive(Debug, Clone)]
pub struct PayloadFixture {
    fixture: PathBuf,
}

impl PayloadFixture {
    /// Fixture path, relative to the feature's directory.
    pub fn new(fixture: impl Into<PathBuf>) -> Self {
        Self {
            fixture: fixture.into(),
        }
    }
}

#[async_trait]
impl ResultChecker for PayloadFixture {
    async fn check(&self, runner: &Runner, run: &WorkflowRun) -> Result<()> {
        let path = runner.feature_dir()?.join(&self.fixture);
        let actual = runner
            .client()
            .result_payload(run.execution())
            .await
            .map_err(HarnessError::Run)?;
        let actual = match actual {
            Some(payload) => payload,
            None => runner.wait_for_raw_result(run).await?,
        };
        verify_against_fixture(&path, &actual)
    }

    fn requires_raw_payload(&self) -> bool {
        true
    }

    fn requires_feature_dir(&self) -> bool {
        true
    }
}

/// Boxed check closure.
pub type CheckFn = Arc<
    dyn for<'a> Fn(&'a Runner, &'a WorkflowRun) -> BoxFuture<'a, Result<()>> + Send + Sync,
>;

/// Scenario-specific check written as a closure.
#[derive(Clone)]
pub struct CustomCheck {
    func: CheckFn,
}

impl CustomCheck {
    /// Wrap `func`.
    pub fn new<F>(func: F) -> Self
    where
        F: for<'a> Fn(&'a Runner, &'a WorkflowRun) -> BoxFuture<'a, Result<()>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            func: Arc::new(func),
        }
    }
}

#[async_trait]
impl ResultChecker for CustomCheck {
    async fn check(&self, runner: &Runner, run: &WorkflowRun) -> Result<()> {
        (self.func)(runner, run).await
    }
}

impl std::fmt::Debug for CustomCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomCheck").finish_non_exhaustive()
    }
}

/// Every inner checker must pass; the first failure is reported.
#[derive(Clone, Default)]
pub struct AllOf {
    checkers: Vec<Arc<dyn ResultChecker>>,
}

impl AllOf {
    /// No checks yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a checker.
    pub fn and(mut self, checker: impl ResultChecker + 'static) -> Self {
        self.checkers.push(Arc::new(checker));
        self
    }
}

#[async_trait]
impl ResultChecker for AllOf {
    async fn check(&self, runner: &Runner, run: &WorkflowRun) -> Result<()> {
        for checker in &self.checkers {
            checker.check(runner, run).await?;
        }
        Ok(())
    }

    fn requires_raw_payload(&self) -> bool {
        self.checkers.iter().any(|c| c.requires_raw_payload())
    }

    fn requires_feature_dir(&self) -> bool {
        self.checkers.iter().any(|c| c.requires_feature_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_types::Json;

    #[test]
    fn test_scalar_compares_decoded_values() {
        let expected = "signal-data".to_payload().unwrap();
        assert!(check_scalar(&expected, &"signal-data".to_payload().unwrap()).is_ok());

        let err = check_scalar(&expected, &"other".to_payload().unwrap()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("signal-data"), "{msg}");
        assert!(msg.contains("other"), "{msg}");
    }

    #[test]
    fn test_scalar_ignores_json_formatting() {
        let compact = Payload::new("json/plain", br#"{"a":1,"b":2}"#.to_vec());
        let spaced = Payload::new("json/plain", br#"{ "b": 2, "a": 1 }"#.to_vec());
        assert!(check_scalar(&compact, &spaced).is_ok());
        assert!(check_scalar(&Json(30).to_payload().unwrap(), &30i64.to_payload().unwrap()).is_ok());
    }

    #[test]
    fn test_scalar_rejects_other_encoding() {
        let bytes = vec![0xdeu8, 0xad, 0xbe, 0xef];
        let binary = bytes.to_payload().unwrap();
        let json = Json(bytes).to_payload().unwrap();
        let msg = check_scalar(&binary, &json).unwrap_err().to_string();
        assert!(msg.contains("binary/plain"), "{msg}");
        assert!(msg.contains("json/plain"), "{msg}");
    }

    #[test]
    fn test_requirements_compose() {
        let plain = AllOf::new().and(CheckDefault).and(ScalarEquality::of(1i64).unwrap());
        assert!(!plain.requires_raw_payload());
        assert!(!plain.requires_feature_dir());

        let with_fixture = plain.and(PayloadFixture::new("payload.json"));
        assert!(with_fixture.requires_raw_payload());
        assert!(with_fixture.requires_feature_dir());
    }
}
