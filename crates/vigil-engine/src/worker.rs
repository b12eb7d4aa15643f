//! Worker registrations.

use std::collections::HashMap;
use std::sync::Weak;

use tracing::info;

use crate::definition::{ActivityDefinition, WorkflowDefinition};
use crate::engine::EngineInner;

/// Workflows and activities served on one task queue.
#[derive(Debug, Clone)]
pub struct Worker {
    task_queue: String,
    workflows: HashMap<String, WorkflowDefinition>,
    activities: HashMap<String, ActivityDefinition>,
}

impl Worker {
    /// Empty worker for `task_queue`.
    pub fn new(task_queue: impl Into<String>) -> Self {
        Self {
            task_queue: task_queue.into(),
            workflows: HashMap::new(),
            activities: HashMap::new(),
        }
    }

    /// Register a workflow. A later registration under the same name wins.
    pub fn register_workflow(mut self, definition: WorkflowDefinition) -> Self {
        self.workflows
            .insert(definition.name().to_string(), definition);
        self
    }

    /// Register an activity. A later registration under the same name wins.
    pub fn register_activity(mut self, definition: ActivityDefinition) -> Self {
        self.activities
            .insert(definition.name().to_string(), definition);
        self
    }

    /// Task queue this worker polls.
    pub fn task_queue(&self) -> &str {
        &self.task_queue
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty() && self.activities.is_empty()
    }

    /// Registered workflow type names, sorted.
    pub fn workflow_types(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.workflows.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub(crate) fn workflow(&self, name: &str) -> Option<&WorkflowDefinition> {
        self.workflows.get(name)
    }

    pub(crate) fn activity(&self, name: &str) -> Option<&ActivityDefinition> {
        self.activities.get(name)
    }
}

/// Keeps a worker registered; dropping it stops the worker.
///
/// Runs already started keep the definitions they were started with.
#[derive(Debug)]
pub struct WorkerHandle {
    pub(crate) engine: Weak<EngineInner>,
    pub(crate) task_queue: String,
}

impl WorkerHandle {
    /// Task queue of the registered worker.
    pub fn task_queue(&self) -> &str {
        &self.task_queue
    }

    /// Stop the worker now.
    pub fn shutdown(self) {}
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        if let Some(engine) = self.engine.upgrade()
            && engine.workers.write().remove(&self.task_queue).is_some()
        {
            info!(task_queue = %self.task_queue, "Worker stopped");
        }
    }
}
