//! The in-process engine.
//!
//! `Engine` keeps every run's history in memory and drives it with the
//! replay driver. Each run sits behind its own mutex; every input (start,
//! signal, update, activity result, timer) is appended to history and the
//! resulting workflow task is executed synchronously under that lock, so
//! inputs to one run are totally ordered by acceptance.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::{oneshot, watch};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;
use vigil_client::{ClientError, Dialer};
use vigil_types::{
    Capabilities, Capability, Failure, Payload, Payloads, SignalEnvelope, StartWorkflowOptions,
    UpdateEnvelope, WorkflowExecution,
};

use crate::activity::{ActivityInfo, ActivityOutcome, PANIC_ERROR, run_activity};
use crate::definition::WorkflowDefinition;
use crate::error::{EngineError, Result};
use crate::history::{Command, HistoryEvent};
use crate::local::LocalClient;
use crate::worker::{Worker, WorkerHandle};
use crate::workflow::WorkflowInfo;
use crate::workflow::driver::{NONDETERMINISM_ERROR, run_workflow_task};

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// The single namespace this engine serves.
    pub namespace: String,

    /// Features the engine advertises.
    pub capabilities: Capabilities,

    /// Rounds a workflow task may keep making progress before it is failed.
    pub workflow_task_poll_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            capabilities: Capabilities::all(),
            workflow_task_poll_limit: 1000,
        }
    }
}

/// Lifecycle state of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    /// Still accepting inputs.
    Running,
    /// Closed with a result.
    Completed(Payload),
    /// Closed with a failure.
    Failed(Failure),
    /// Closed by its execution timeout.
    TimedOut,
}

impl RunStatus {
    /// Whether the run is closed.
    pub fn is_closed(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }
}

type UpdateReply = oneshot::Sender<std::result::Result<Payload, ClientError>>;

pub(crate) struct Run {
    execution: WorkflowExecution,
    workflow_type: String,
    task_queue: String,
    worker: Arc<Worker>,
    definition: WorkflowDefinition,
    history: Vec<HistoryEvent>,
    status: RunStatus,
    updates: HashMap<String, UpdateReply>,
    tasks: Vec<AbortHandle>,
    closed: watch::Sender<bool>,
}

impl Run {
    fn info(&self) -> WorkflowInfo {
        WorkflowInfo {
            execution: self.execution.clone(),
            workflow_type: self.workflow_type.clone(),
            task_queue: self.task_queue.clone(),
        }
    }
}

type RunRef = Arc<Mutex<Run>>;

/// State spawned tasks need without holding the engine itself.
pub(crate) struct TaskEnv {
    poll_limit: usize,
    dialer: RwLock<Option<Arc<dyn Dialer>>>,
}

pub(crate) struct EngineInner {
    config: EngineConfig,
    pub(crate) workers: RwLock<HashMap<String, Arc<Worker>>>,
    /// Every run by workflow id. Closed runs are kept for the engine's
    /// lifetime so results, history and replay stay available.
    runs: Mutex<HashMap<String, RunRef>>,
    env: Arc<TaskEnv>,
}

/// Deterministic in-process workflow engine.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    /// Create an engine.
    pub fn new(config: EngineConfig) -> Self {
        info!(namespace = %config.namespace, "Engine initialized");
        let env = Arc::new(TaskEnv {
            poll_limit: config.workflow_task_poll_limit,
            dialer: RwLock::new(None),
        });
        Self {
            inner: Arc::new(EngineInner {
                config,
                workers: RwLock::new(HashMap::new()),
                runs: Mutex::new(HashMap::new()),
                env,
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> Weak<EngineInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(inner: &Weak<EngineInner>) -> Option<Self> {
        inner.upgrade().map(|inner| Self { inner })
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Namespace served by this engine.
    pub fn namespace(&self) -> &str {
        &self.inner.config.namespace
    }

    /// Install the dialer activities use to open their own connections.
    pub fn set_dialer(&self, dialer: Arc<dyn Dialer>) {
        *self.inner.env.dialer.write() = Some(dialer);
    }

    /// A client bound to this engine's namespace.
    pub fn client(&self, identity: impl Into<String>) -> LocalClient {
        LocalClient::new(self.clone(), identity)
    }

    /// Register a worker. One worker per task queue.
    pub fn start_worker(&self, worker: Worker) -> Result<WorkerHandle> {
        if worker.is_empty() {
            return Err(EngineError::InvalidWorker(format!(
                "worker for '{}' registers nothing",
                worker.task_queue()
            )));
        }
        let task_queue = worker.task_queue().to_string();
        let mut workers = self.inner.workers.write();
        if workers.contains_key(&task_queue) {
            return Err(EngineError::WorkerConflict(task_queue));
        }
        info!(
            task_queue = %task_queue,
            workflows = ?worker.workflow_types(),
            "Worker started"
        );
        workers.insert(task_queue.clone(), Arc::new(worker));
        Ok(WorkerHandle {
            engine: Arc::downgrade(&self.inner),
            task_queue,
        })
    }

    /// Number of runs submitted and still retained, open or closed.
    pub fn run_count(&self) -> usize {
        self.inner.runs.lock().len()
    }

    /// Advertised capabilities.
    pub fn capabilities(&self) -> Capabilities {
        self.inner.config.capabilities.clone()
    }

    /// Submit a workflow run.
    ///
    /// Must be called from within a tokio runtime; activities and timers
    /// are spawned onto it.
    pub fn start_workflow(
        &self,
        workflow_type: &str,
        args: Payloads,
        options: StartWorkflowOptions,
    ) -> std::result::Result<WorkflowExecution, ClientError> {
        if options.task_queue.is_empty() {
            return Err(ClientError::InvalidArgument("task queue is required".into()));
        }
        let worker = self
            .inner
            .workers
            .read()
            .get(&options.task_queue)
            .cloned()
            .ok_or_else(|| {
                ClientError::InvalidArgument(format!(
                    "no worker is polling task queue '{}'",
                    options.task_queue
                ))
            })?;
        let definition = worker.workflow(workflow_type).cloned().ok_or_else(|| {
            ClientError::InvalidArgument(format!(
                "workflow type '{workflow_type}' is not registered on '{}'",
                options.task_queue
            ))
        })?;

        let workflow_id = if options.id.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            options.id.clone()
        };

        let mut runs = self.inner.runs.lock();
        if let Some(existing) = runs.get(&workflow_id)
            && !existing.lock().status.is_closed()
        {
            return Err(ClientError::AlreadyStarted(workflow_id));
        }

        let execution = WorkflowExecution {
            namespace: self.inner.config.namespace.clone(),
            workflow_id: workflow_id.clone(),
            run_id: Uuid::new_v4().to_string(),
        };
        let (closed, _) = watch::channel(false);
        let run = Arc::new(Mutex::new(Run {
            execution: execution.clone(),
            workflow_type: workflow_type.to_string(),
            task_queue: options.task_queue.clone(),
            worker,
            definition,
            history: vec![HistoryEvent::WorkflowStarted {
                workflow_type: workflow_type.to_string(),
                task_queue: options.task_queue.clone(),
                args,
            }],
            status: RunStatus::Running,
            updates: HashMap::new(),
            tasks: Vec::new(),
            closed,
        }));
        runs.insert(workflow_id, run.clone());
        drop(runs);

        info!(
            workflow_type,
            workflow_id = %execution.workflow_id,
            run_id = %execution.run_id,
            "Workflow started"
        );

        let mut guard = run.lock();
        if let Some(timeout) = options.execution_timeout {
            let timer = spawn_execution_timeout(&run, timeout);
            guard.tasks.push(timer);
        }
        advance(&self.inner.env, &run, &mut guard);
        Ok(execution)
    }

    /// Deliver a signal; returns once it is recorded in history.
    pub fn signal(
        &self,
        execution: &WorkflowExecution,
        signal: SignalEnvelope,
    ) -> std::result::Result<(), ClientError> {
        let run = self.find_run(execution)?;
        let mut guard = run.lock();
        ensure_open(&guard)?;
        debug!(
            workflow_id = %execution.workflow_id,
            signal = %signal.name,
            "Signal received"
        );
        guard.history.push(HistoryEvent::SignalReceived {
            name: signal.name,
            payload: signal.payload,
        });
        advance(&self.inner.env, &run, &mut guard);
        Ok(())
    }

    /// Deliver an update and wait for its outcome.
    pub async fn update(
        &self,
        execution: &WorkflowExecution,
        update: UpdateEnvelope,
    ) -> std::result::Result<Payload, ClientError> {
        if !self.inner.config.capabilities.supports(Capability::Updates) {
            return Err(ClientError::PermissionDenied(
                "workflow updates are disabled on this engine".into(),
            ));
        }
        let run = self.find_run(execution)?;
        let reply = {
            let mut guard = run.lock();
            ensure_open(&guard)?;
            let update_id = Uuid::new_v4().to_string();
            let (tx, rx) = oneshot::channel();
            guard.updates.insert(update_id.clone(), tx);
            debug!(
                workflow_id = %execution.workflow_id,
                update = %update.name,
                update_id = %update_id,
                "Update requested"
            );
            guard.history.push(HistoryEvent::UpdateRequested {
                update_id,
                name: update.name.clone(),
                args: update.args,
            });
            advance(&self.inner.env, &run, &mut guard);
            rx
        };
        reply
            .await
            .map_err(|_| ClientError::Cancelled(format!("update '{}'", update.name)))?
    }

    /// Stored result of a closed run; `None` while it is open.
    pub fn result_payload(
        &self,
        execution: &WorkflowExecution,
    ) -> std::result::Result<Option<Payload>, ClientError> {
        let run = self.find_run(execution)?;
        let guard = run.lock();
        match &guard.status {
            RunStatus::Running => Ok(None),
            RunStatus::Completed(result) => Ok(Some(result.clone())),
            RunStatus::Failed(failure) => Err(ClientError::WorkflowFailed(failure.clone())),
            RunStatus::TimedOut => Err(ClientError::WorkflowTimedOut),
        }
    }

    /// Wait for the run to close and return its result.
    pub async fn wait_for_result(
        &self,
        execution: &WorkflowExecution,
    ) -> std::result::Result<Payload, ClientError> {
        let run = self.find_run(execution)?;
        let mut closed = run.lock().closed.subscribe();
        closed
            .wait_for(|closed| *closed)
            .await
            .map_err(|_| ClientError::Cancelled(format!("result of {execution}")))?;
        self.result_payload(execution)?
            .ok_or_else(|| ClientError::Cancelled(format!("result of {execution}")))
    }

    /// Current status of a run.
    pub fn status(
        &self,
        execution: &WorkflowExecution,
    ) -> std::result::Result<RunStatus, ClientError> {
        Ok(self.find_run(execution)?.lock().status.clone())
    }

    /// Snapshot of a run's history.
    pub fn history(
        &self,
        execution: &WorkflowExecution,
    ) -> std::result::Result<Vec<HistoryEvent>, ClientError> {
        Ok(self.find_run(execution)?.lock().history.clone())
    }

    /// Replay a closed run's full history and verify it reproduces every
    /// recorded command.
    pub fn replay(&self, execution: &WorkflowExecution) -> Result<()> {
        let run = self.find_run(execution)?;
        let (definition, info, history) = {
            let guard = run.lock();
            if !guard.status.is_closed() {
                return Err(EngineError::RunOpen(execution.to_string()));
            }
            (guard.definition.clone(), guard.info(), guard.history.clone())
        };
        replay_with(&definition, info, &history, self.inner.env.poll_limit)
    }

    fn find_run(&self, execution: &WorkflowExecution) -> std::result::Result<RunRef, ClientError> {
        if execution.namespace != self.inner.config.namespace {
            return Err(ClientError::NotFound(format!(
                "namespace '{}'",
                execution.namespace
            )));
        }
        let run = self
            .inner
            .runs
            .lock()
            .get(&execution.workflow_id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("workflow '{}'", execution.workflow_id)))?;
        if !execution.run_id.is_empty() && run.lock().execution.run_id != execution.run_id {
            return Err(ClientError::NotFound(format!("run {execution}")));
        }
        Ok(run)
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.inner.config)
            .field("runs", &self.inner.runs.lock().len())
            .finish()
    }
}

/// Replay a complete history against `definition` without an engine.
///
/// Fails when the code emits commands that differ from those recorded, or
/// emits anything beyond them.
pub fn replay_history(definition: &WorkflowDefinition, history: &[HistoryEvent]) -> Result<()> {
    let info = match history.first() {
        Some(HistoryEvent::WorkflowStarted {
            workflow_type,
            task_queue,
            ..
        }) => WorkflowInfo {
            execution: WorkflowExecution {
                namespace: String::new(),
                workflow_id: String::new(),
                run_id: String::new(),
            },
            workflow_type: workflow_type.clone(),
            task_queue: task_queue.clone(),
        },
        _ => {
            return Err(EngineError::Nondeterminism(
                "history does not begin with WorkflowStarted".into(),
            ));
        }
    };
    replay_with(
        definition,
        info,
        history,
        EngineConfig::default().workflow_task_poll_limit,
    )
}

fn replay_with(
    definition: &WorkflowDefinition,
    info: WorkflowInfo,
    history: &[HistoryEvent],
    poll_limit: usize,
) -> Result<()> {
    let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
        run_workflow_task(definition, info, history, poll_limit)
    }));
    match outcome {
        Ok(Ok(extra)) if extra.is_empty() => Ok(()),
        Ok(Ok(extra)) => Err(EngineError::Nondeterminism(format!(
            "replay produced commands beyond recorded history: {extra:?}"
        ))),
        Ok(Err(failure)) => Err(EngineError::Nondeterminism(failure.message)),
        Err(_) => Err(EngineError::Nondeterminism(
            "workflow panicked during replay".into(),
        )),
    }
}

fn ensure_open(run: &Run) -> std::result::Result<(), ClientError> {
    if run.status.is_closed() {
        Err(ClientError::NotFound(format!(
            "workflow execution already completed: {}",
            run.execution
        )))
    } else {
        Ok(())
    }
}

/// Append `event` to an open run and execute the resulting workflow task.
fn deliver(env: &Arc<TaskEnv>, run: &RunRef, event: HistoryEvent) {
    let mut guard = run.lock();
    if guard.status.is_closed() {
        return;
    }
    guard.history.push(event);
    advance(env, run, &mut guard);
}

/// Run one workflow task over the run's history and apply its commands.
fn advance(env: &Arc<TaskEnv>, handle: &RunRef, run: &mut Run) {
    if run.status.is_closed() {
        return;
    }
    let info = run.info();
    let task = std::panic::catch_unwind(AssertUnwindSafe(|| {
        run_workflow_task(&run.definition, info, &run.history, env.poll_limit)
    }));
    let commands = match task {
        Ok(Ok(commands)) => commands,
        Ok(Err(failure)) => {
            if failure.error_type == NONDETERMINISM_ERROR {
                warn!(execution = %run.execution, error = %failure, "Nondeterministic workflow");
            }
            close(run, RunStatus::Failed(failure));
            return;
        }
        Err(_) => {
            close(
                run,
                RunStatus::Failed(Failure::non_retryable(
                    PANIC_ERROR,
                    format!("workflow '{}' panicked", run.workflow_type),
                )),
            );
            return;
        }
    };

    run.history.push(HistoryEvent::WorkflowTaskCompleted {
        commands: commands.clone(),
    });

    let mut closing = None;
    for command in commands {
        match command {
            Command::ScheduleActivity {
                seq,
                activity_type,
                args,
                options,
            } => {
                let info = ActivityInfo {
                    workflow_execution: run.execution.clone(),
                    seq,
                    activity_type: activity_type.clone(),
                    attempt: 1,
                    task_queue: run.task_queue.clone(),
                };
                let definition = run.worker.activity(&activity_type).cloned();
                let dialer = env.dialer.read().clone();
                let env = env.clone();
                let handle = handle.clone();
                let task = tokio::spawn(async move {
                    let outcome = match definition {
                        Some(definition) => {
                            run_activity(definition, info, args, options, dialer).await
                        }
                        None => ActivityOutcome::Failed {
                            attempt: 1,
                            failure: Failure::non_retryable(
                                "ActivityNotRegistered",
                                format!("activity type '{activity_type}' is not registered"),
                            ),
                        },
                    };
                    let event = match outcome {
                        ActivityOutcome::Completed { attempt, result } => {
                            HistoryEvent::ActivityCompleted {
                                seq,
                                attempt,
                                result,
                            }
                        }
                        ActivityOutcome::Failed { attempt, failure } => {
                            HistoryEvent::ActivityFailed {
                                seq,
                                attempt,
                                failure,
                            }
                        }
                    };
                    deliver(&env, &handle, event);
                });
                run.tasks.push(task.abort_handle());
            }
            Command::StartTimer { seq, duration } => {
                let env = env.clone();
                let handle = handle.clone();
                let task = tokio::spawn(async move {
                    tokio::time::sleep(duration).await;
                    deliver(&env, &handle, HistoryEvent::TimerFired { seq });
                });
                run.tasks.push(task.abort_handle());
            }
            Command::CompleteUpdate { update_id, outcome } => {
                reply_update(run, &update_id, outcome.map_err(ClientError::UpdateFailed));
            }
            Command::RejectUpdate { update_id, failure } => {
                reply_update(run, &update_id, Err(ClientError::UpdateFailed(failure)));
            }
            Command::CompleteWorkflow { result } => {
                closing = Some(RunStatus::Completed(result));
            }
            Command::FailWorkflow { failure } => {
                closing = Some(RunStatus::Failed(failure));
            }
        }
    }

    if let Some(status) = closing {
        close(run, status);
    }
}

fn reply_update(
    run: &mut Run,
    update_id: &str,
    outcome: std::result::Result<Payload, ClientError>,
) {
    if let Some(reply) = run.updates.remove(update_id) {
        // The caller may have given up waiting.
        let _ = reply.send(outcome);
    }
}

fn close(run: &mut Run, status: RunStatus) {
    let event = match &status {
        RunStatus::Completed(result) => HistoryEvent::WorkflowCompleted {
            result: result.clone(),
        },
        RunStatus::Failed(failure) => HistoryEvent::WorkflowFailed {
            failure: failure.clone(),
        },
        RunStatus::TimedOut => HistoryEvent::WorkflowTimedOut,
        RunStatus::Running => return,
    };
    info!(
        execution = %run.execution,
        outcome = match &status {
            RunStatus::Completed(_) => "completed",
            RunStatus::Failed(_) => "failed",
            _ => "timed_out",
        },
        "Workflow closed"
    );
    run.history.push(event);
    run.status = status;

    for (_, reply) in run.updates.drain() {
        let _ = reply.send(Err(ClientError::NotFound(format!(
            "workflow execution already completed: {}",
            run.execution
        ))));
    }
    for task in run.tasks.drain(..) {
        task.abort();
    }
    run.closed.send_replace(true);
}

fn spawn_execution_timeout(run: &RunRef, timeout: Duration) -> AbortHandle {
    let handle = run.clone();
    tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        let mut guard = handle.lock();
        if !guard.status.is_closed() {
            close(&mut guard, RunStatus::TimedOut);
        }
    })
    .abort_handle()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.namespace, "default");
        assert_eq!(config.capabilities, Capabilities::all());
        assert_eq!(config.workflow_task_poll_limit, 1000);
    }

    #[test]
    fn test_run_status_closed() {
        assert!(!RunStatus::Running.is_closed());
        assert!(RunStatus::TimedOut.is_closed());
        assert!(RunStatus::Completed(Payload::null()).is_closed());
    }

    #[test]
    fn test_start_without_worker() {
        let engine = Engine::new(EngineConfig::default());
        let err = engine
            .start_workflow(
                "Missing",
                vec![],
                StartWorkflowOptions {
                    task_queue: "nowhere".into(),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));
    }

    #[test]
    fn test_find_run_wrong_namespace() {
        let engine = Engine::new(EngineConfig::default());
        let execution = WorkflowExecution {
            namespace: "other".into(),
            workflow_id: "wf".into(),
            run_id: String::new(),
        };
        assert!(engine.history(&execution).unwrap_err().is_not_found());
    }

    #[test]
    fn test_empty_worker_rejected() {
        let engine = Engine::new(EngineConfig::default());
        let err = engine.start_worker(Worker::new("tq")).unwrap_err();
        assert!(matches!(err, EngineError::InvalidWorker(_)));
    }
}
