//! Feature descriptors.
//!
//! A [`Feature`] binds one workflow, its activities, an execution strategy
//! and a result checker into a runnable scenario. Descriptors are built once
//! through [`FeatureBuilder`], which rejects inconsistent combinations, and
//! are immutable afterwards.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use vigil_engine::{ActivityDefinition, Worker, WorkflowDefinition};
use vigil_types::{ConverterError, Payload, StartWorkflowOptions, ToPayload};

use crate::checker::{CheckDefault, ResultChecker};
use crate::error::{HarnessError, Result};
use crate::execution::{DefaultExecution, ExecutionStrategy};

/// One runnable scenario.
#[derive(Clone)]
pub struct Feature {
    name: String,
    dir: Option<PathBuf>,
    workflow: WorkflowDefinition,
    activities: Vec<ActivityDefinition>,
    start_options: StartWorkflowOptions,
    expected_result: Option<Payload>,
    execution: Arc<dyn ExecutionStrategy>,
    checker: Arc<dyn ResultChecker>,
}

impl Feature {
    /// Start describing a feature named `name` (conventionally `group/case`).
    pub fn builder(name: impl Into<String>, workflow: WorkflowDefinition) -> FeatureBuilder {
        FeatureBuilder {
            name: name.into(),
            dir: None,
            workflow,
            activities: Vec::new(),
            start_options: StartWorkflowOptions::default(),
            expected_result: None,
            execution: None,
            checker: None,
        }
    }

    /// Feature name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory holding the feature's fixtures.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// The workflow entry point.
    pub fn workflow(&self) -> &WorkflowDefinition {
        &self.workflow
    }

    /// Activities the workflow may schedule.
    pub fn activities(&self) -> &[ActivityDefinition] {
        &self.activities
    }

    /// Options used by default submission.
    pub fn start_options(&self) -> &StartWorkflowOptions {
        &self.start_options
    }

    /// Expected workflow result for the default check.
    pub fn expected_result(&self) -> Option<&Payload> {
        self.expected_result.as_ref()
    }

    /// How the feature is launched.
    pub fn execution(&self) -> &dyn ExecutionStrategy {
        self.execution.as_ref()
    }

    /// How the outcome is verified.
    pub fn checker(&self) -> &dyn ResultChecker {
        self.checker.as_ref()
    }

    /// Worker serving this feature on `task_queue`.
    pub fn worker(&self, task_queue: &str) -> Worker {
        self.activities.iter().cloned().fold(
            Worker::new(task_queue).register_workflow(self.workflow.clone()),
            Worker::register_activity,
        )
    }
}

impl std::fmt::Debug for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Feature")
            .field("name", &self.name)
            .field("workflow", &self.workflow.name())
            .field("activities", &self.activities.len())
            .field("execution", &self.execution.describe())
            .finish()
    }
}

/// Builder for [`Feature`].
pub struct FeatureBuilder {
    name: String,
    dir: Option<PathBuf>,
    workflow: WorkflowDefinition,
    activities: Vec<ActivityDefinition>,
    start_options: StartWorkflowOptions,
    expected_result: Option<std::result::Result<Payload, ConverterError>>,
    execution: Option<Arc<dyn ExecutionStrategy>>,
    checker: Option<Arc<dyn ResultChecker>>,
}

impl FeatureBuilder {
    /// Directory fixtures are resolved against.
    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    /// Add an activity.
    pub fn activity(mut self, activity: ActivityDefinition) -> Self {
        self.activities.push(activity);
        self
    }

    /// Options for default submission.
    pub fn start_options(mut self, options: StartWorkflowOptions) -> Self {
        self.start_options = options;
        self
    }

    /// Expected workflow result, checked by the default checker.
    pub fn expect_result<T: ToPayload>(mut self, value: T) -> Self {
        self.expected_result = Some(value.to_payload());
        self
    }

    /// Execution strategy; submission with default options when unset.
    pub fn execute(mut self, strategy: impl ExecutionStrategy + 'static) -> Self {
        self.execution = Some(Arc::new(strategy));
        self
    }

    /// Result checker; [`CheckDefault`] when unset.
    pub fn check(mut self, checker: impl ResultChecker + 'static) -> Self {
        self.checker = Some(Arc::new(checker));
        self
    }

    /// Validate and build.
    pub fn build(self) -> Result<Feature> {
        let invalid = |reason: String| HarnessError::InvalidFeature {
            name: self.name.clone(),
            reason,
        };

        if self.name.is_empty() {
            return Err(invalid("name must not be empty".into()));
        }

        let mut seen = HashSet::new();
        for activity in &self.activities {
            if !seen.insert(activity.name()) {
                return Err(invalid(format!(
                    "activity '{}' registered twice",
                    activity.name()
                )));
            }
        }

        let expected_result = self
            .expected_result
            .transpose()
            .map_err(|e| invalid(format!("expected result does not encode: {e}")))?;

        let execution = self
            .execution
            .unwrap_or_else(|| Arc::new(DefaultExecution));
        let checker = self.checker.unwrap_or_else(|| Arc::new(CheckDefault));

        if checker.requires_raw_payload() && !execution.preserves_result_payload() {
            return Err(invalid(format!(
                "checker compares the raw result payload but execution '{}' alters it",
                execution.describe()
            )));
        }
        if checker.requires_feature_dir() && self.dir.is_none() {
            return Err(invalid("checker loads fixtures but no directory is set".into()));
        }

        Ok(Feature {
            name: self.name,
            dir: self.dir,
            workflow: self.workflow,
            activities: self.activities,
            start_options: self.start_options,
            expected_result,
            execution,
            checker,
        })
    }
}
