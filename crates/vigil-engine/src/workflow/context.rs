//! The deterministic workflow context.
//!
//! A [`WorkflowContext`] is the only door workflow code has to the outside
//! world. Everything it hands out (activity results, signals, timers) comes
//! from the history being replayed, and everything workflow code asks for
//! becomes a [`Command`] the driver compares against history.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use vigil_types::{ActivityOptions, Failure, Payload, Payloads, WorkflowExecution};

use crate::definition::WorkflowResult;
use crate::history::Command;
use crate::workflow::primitives::{ActivityFuture, Condition, SignalChannel, TimerFuture};

/// Static facts about the running workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowInfo {
    /// Run identity.
    pub execution: WorkflowExecution,
    /// Registered workflow type name.
    pub workflow_type: String,
    /// Task queue the run was routed to.
    pub task_queue: String,
}

pub(crate) type HandlerFn = Rc<dyn Fn(Payloads) -> LocalBoxFuture<'static, WorkflowResult<Payload>>>;
pub(crate) type ValidatorFn = Rc<dyn Fn(&Payloads) -> WorkflowResult<()>>;

#[derive(Clone)]
pub(crate) struct UpdateHandler {
    pub(crate) handler: HandlerFn,
    pub(crate) validator: Option<ValidatorFn>,
}

pub(crate) struct PendingUpdate {
    pub(crate) update_id: String,
    pub(crate) name: String,
    pub(crate) args: Payloads,
}

/// Mutable state shared by the context and every future it hands out.
pub(crate) struct WorkflowState {
    pub(crate) info: WorkflowInfo,
    pub(crate) commands: Vec<Command>,
    pub(crate) activity_results: HashMap<u32, Result<Payload, Failure>>,
    pub(crate) fired_timers: HashSet<u32>,
    pub(crate) signals: HashMap<String, VecDeque<Option<Payload>>>,
    pub(crate) update_handlers: HashMap<String, UpdateHandler>,
    pub(crate) pending_updates: VecDeque<PendingUpdate>,
    next_activity_seq: u32,
    next_timer_seq: u32,
    progress: u64,
}

impl WorkflowState {
    pub(crate) fn bump(&mut self) {
        self.progress += 1;
    }

    pub(crate) fn emit(&mut self, command: Command) {
        self.commands.push(command);
        self.bump();
    }
}

/// Handle workflow code uses to interact with the engine.
///
/// Cheap to clone; all clones share one state.
#[derive(Clone)]
pub struct WorkflowContext {
    pub(crate) state: Rc<RefCell<WorkflowState>>,
}

impl WorkflowContext {
    pub(crate) fn new(info: WorkflowInfo) -> Self {
        Self {
            state: Rc::new(RefCell::new(WorkflowState {
                info,
                commands: Vec::new(),
                activity_results: HashMap::new(),
                fired_timers: HashSet::new(),
                signals: HashMap::new(),
                update_handlers: HashMap::new(),
                pending_updates: VecDeque::new(),
                next_activity_seq: 0,
                next_timer_seq: 0,
                progress: 0,
            })),
        }
    }

    /// Facts about this run.
    pub fn info(&self) -> WorkflowInfo {
        self.state.borrow().info.clone()
    }

    /// Schedule an activity. The command is issued immediately; awaiting the
    /// returned future waits for its result.
    pub fn execute_activity(
        &self,
        activity_type: &str,
        args: Payloads,
        options: ActivityOptions,
    ) -> ActivityFuture {
        let mut state = self.state.borrow_mut();
        state.next_activity_seq += 1;
        let seq = state.next_activity_seq;
        state.emit(Command::ScheduleActivity {
            seq,
            activity_type: activity_type.to_string(),
            args,
            options,
        });
        ActivityFuture::new(self.state.clone(), seq)
    }

    /// Start a durable timer.
    pub fn sleep(&self, duration: Duration) -> TimerFuture {
        let mut state = self.state.borrow_mut();
        state.next_timer_seq += 1;
        let seq = state.next_timer_seq;
        state.emit(Command::StartTimer { seq, duration });
        TimerFuture::new(self.state.clone(), seq)
    }

    /// Channel yielding signals delivered under `name`, oldest first.
    ///
    /// Signals that arrive before anyone listens are buffered.
    pub fn signal_channel(&self, name: &str) -> SignalChannel {
        SignalChannel::new(self.state.clone(), name)
    }

    /// Resolve once `condition` holds.
    pub fn wait_condition<F>(&self, condition: F) -> Condition<F>
    where
        F: FnMut() -> bool,
    {
        Condition::new(condition)
    }

    /// Register the handler invoked for updates named `name`.
    ///
    /// Register handlers before the first `await` so every replay sees them
    /// at the same point.
    pub fn set_update_handler<F, Fut>(&self, name: &str, handler: F)
    where
        F: Fn(Payloads) -> Fut + 'static,
        Fut: Future<Output = WorkflowResult<Payload>> + 'static,
    {
        self.register_update(name, handler, None);
    }

    /// Register an update handler guarded by a validator.
    ///
    /// A validator error rejects the update before the handler runs; it must
    /// not mutate workflow state.
    pub fn set_update_handler_with_validator<F, Fut, V>(&self, name: &str, handler: F, validator: V)
    where
        F: Fn(Payloads) -> Fut + 'static,
        Fut: Future<Output = WorkflowResult<Payload>> + 'static,
        V: Fn(&Payloads) -> WorkflowResult<()> + 'static,
    {
        self.register_update(name, handler, Some(Rc::new(validator)));
    }

    fn register_update<F, Fut>(&self, name: &str, handler: F, validator: Option<ValidatorFn>)
    where
        F: Fn(Payloads) -> Fut + 'static,
        Fut: Future<Output = WorkflowResult<Payload>> + 'static,
    {
        let handler: HandlerFn = Rc::new(move |args| handler(args).boxed_local());
        self.state
            .borrow_mut()
            .update_handlers
            .insert(name.to_string(), UpdateHandler { handler, validator });
    }

    pub(crate) fn progress(&self) -> u64 {
        self.state.borrow().progress
    }

    pub(crate) fn command_count(&self) -> usize {
        self.state.borrow().commands.len()
    }

    pub(crate) fn commands_since(&self, start: usize) -> Vec<Command> {
        self.state.borrow().commands[start..].to_vec()
    }

    pub(crate) fn emit(&self, command: Command) {
        self.state.borrow_mut().emit(command);
    }
}

impl std::fmt::Debug for WorkflowContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("WorkflowContext")
            .field("info", &state.info)
            .field("commands", &state.commands.len())
            .finish()
    }
}
