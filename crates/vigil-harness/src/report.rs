//! Per-feature outcomes and the batch summary.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::HarnessError;

/// How one feature ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed { error: String },
    Skipped { reason: String },
}

impl Outcome {
    /// Classify a feature's result. Skips are not failures.
    pub fn from_result(result: &crate::error::Result<()>) -> Self {
        match result {
            Ok(()) => Outcome::Passed,
            Err(HarnessError::Skipped(reason)) => Outcome::Skipped {
                reason: reason.clone(),
            },
            Err(err) => Outcome::Failed {
                error: err.to_string(),
            },
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, Outcome::Passed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Outcome::Skipped { .. })
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Passed => f.write_str("PASS"),
            Outcome::Failed { error } => write!(f, "FAIL: {error}"),
            Outcome::Skipped { reason } => write!(f, "SKIP: {reason}"),
        }
    }
}

/// Result of running one feature.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureReport {
    pub name: String,
    pub task_queue: String,
    #[serde(flatten)]
    pub outcome: Outcome,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

/// Result of running a batch, in the order features were given.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub reports: Vec<FeatureReport>,
}

impl RunSummary {
    pub fn passed(&self) -> usize {
        self.reports.iter().filter(|r| r.outcome.is_passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.reports.iter().filter(|r| r.outcome.is_failed()).count()
    }

    pub fn skipped(&self) -> usize {
        self.reports.iter().filter(|r| r.outcome.is_skipped()).count()
    }

    pub fn total(&self) -> usize {
        self.reports.len()
    }

    /// No feature failed.
    pub fn success(&self) -> bool {
        self.failed() == 0
    }

    /// Report for the feature named `name`.
    pub fn report(&self, name: &str) -> Option<&FeatureReport> {
        self.reports.iter().find(|r| r.name == name)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} passed, {} failed, {} skipped",
            self.passed(),
            self.failed(),
            self.skipped()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(name: &str, outcome: Outcome) -> FeatureReport {
        FeatureReport {
            name: name.to_string(),
            task_queue: format!("vigil-{name}"),
            outcome,
            started_at: Utc::now(),
            duration_ms: 5,
        }
    }

    #[test]
    fn test_classification() {
        assert_eq!(Outcome::from_result(&Ok(())), Outcome::Passed);
        assert!(Outcome::from_result(&Err(HarnessError::Skipped("no updates".into()))).is_skipped());
        assert!(Outcome::from_result(&Err(HarnessError::Check("bad".into()))).is_failed());
    }

    #[test]
    fn test_summary_counts() {
        let now = Utc::now();
        let summary = RunSummary {
            started_at: now,
            finished_at: now,
            reports: vec![
                report("a", Outcome::Passed),
                report("b", Outcome::Skipped { reason: "r".into() }),
                report("c", Outcome::Passed),
            ],
        };
        assert_eq!(summary.total(), 3);
        assert!(summary.success());
        assert_eq!(summary.to_string(), "2 passed, 0 failed, 1 skipped");
        assert!(summary.report("b").unwrap().outcome.is_skipped());
    }

    #[test]
    fn test_json_shape() {
        let value = serde_json::to_value(report(
            "signal/basic",
            Outcome::Failed {
                error: "boom".into(),
            },
        ))
        .unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["error"], "boom");
        assert_eq!(value["name"], "signal/basic");
    }
}
