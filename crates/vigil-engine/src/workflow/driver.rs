//! Replay driver.
//!
//! Every workflow task rebuilds the workflow from scratch and feeds it the
//! run's history one batch at a time, where a batch is the inputs accepted
//! between two `WorkflowTaskCompleted` markers. After each recorded batch the
//! commands the code emitted must equal the recorded ones; after the final,
//! open batch the newly emitted commands are the task's output.
//!
//! Within a batch inputs are applied in history order, then the workflow is
//! polled until no future makes progress: pending updates are accepted (or
//! rejected), update handlers are polled in acceptance order, and the main
//! future is polled last so it observes state the handlers just changed.

use std::task::{Context, Poll};

use futures::future::LocalBoxFuture;
use futures::task::noop_waker_ref;
use tracing::trace;
use vigil_types::{Failure, Payload};

use crate::definition::{WorkflowDefinition, WorkflowResult};
use crate::error::WorkflowError;
use crate::history::{Command, HistoryEvent};
use crate::workflow::context::{PendingUpdate, WorkflowContext, WorkflowInfo};

/// Error type recorded when replay diverges from history.
pub const NONDETERMINISM_ERROR: &str = "NondeterminismError";

/// Error type recorded when a workflow task never settles.
pub const TASK_LIMIT_ERROR: &str = "WorkflowTaskLimitExceeded";

/// Error type recorded when an update names no registered handler.
pub const UNKNOWN_UPDATE_ERROR: &str = "UnknownUpdate";

struct Batch<'a> {
    events: Vec<&'a HistoryEvent>,
    recorded: Option<&'a [Command]>,
}

fn split_batches(history: &[HistoryEvent]) -> Vec<Batch<'_>> {
    let mut batches = Vec::new();
    let mut events = Vec::new();
    for event in history {
        match event {
            HistoryEvent::WorkflowTaskCompleted { commands } => batches.push(Batch {
                events: std::mem::take(&mut events),
                recorded: Some(commands.as_slice()),
            }),
            e if e.is_terminal() => {}
            e => events.push(e),
        }
    }
    batches.push(Batch {
        events,
        recorded: None,
    });
    batches
}

type WorkflowFuture = LocalBoxFuture<'static, WorkflowResult<Payload>>;

struct Machine {
    ctx: WorkflowContext,
    main: Option<WorkflowFuture>,
    handlers: Vec<(String, WorkflowFuture)>,
    started: bool,
    poll_limit: usize,
}

impl Machine {
    fn apply(&self, event: &HistoryEvent) {
        let mut state = self.ctx.state.borrow_mut();
        match event {
            HistoryEvent::SignalReceived { name, payload } => {
                state
                    .signals
                    .entry(name.clone())
                    .or_default()
                    .push_back(payload.clone());
            }
            HistoryEvent::UpdateRequested {
                update_id,
                name,
                args,
            } => state.pending_updates.push_back(PendingUpdate {
                update_id: update_id.clone(),
                name: name.clone(),
                args: args.clone(),
            }),
            HistoryEvent::ActivityCompleted { seq, result, .. } => {
                state.activity_results.insert(*seq, Ok(result.clone()));
            }
            HistoryEvent::ActivityFailed { seq, failure, .. } => {
                state.activity_results.insert(*seq, Err(failure.clone()));
            }
            HistoryEvent::TimerFired { seq } => {
                state.fired_timers.insert(*seq);
            }
            _ => {}
        }
    }

    fn run_until_blocked(&mut self) -> Result<(), Failure> {
        let mut cx = Context::from_waker(noop_waker_ref());
        let mut rounds = 0;
        loop {
            let before = self.ctx.progress();
            if !self.started {
                self.started = true;
                self.poll_main(&mut cx);
            }
            self.accept_updates();
            self.poll_handlers(&mut cx);
            self.poll_main(&mut cx);
            if self.ctx.progress() == before {
                return Ok(());
            }
            rounds += 1;
            if rounds >= self.poll_limit {
                return Err(Failure::non_retryable(
                    TASK_LIMIT_ERROR,
                    format!("workflow made progress for {rounds} rounds without blocking"),
                ));
            }
        }
    }

    fn accept_updates(&mut self) {
        loop {
            let pending = self.ctx.state.borrow_mut().pending_updates.pop_front();
            let Some(update) = pending else {
                break;
            };
            let handler = self
                .ctx
                .state
                .borrow()
                .update_handlers
                .get(&update.name)
                .cloned();
            let Some(handler) = handler else {
                self.ctx.emit(Command::RejectUpdate {
                    update_id: update.update_id,
                    failure: Failure::non_retryable(
                        UNKNOWN_UPDATE_ERROR,
                        format!("no update handler registered for '{}'", update.name),
                    ),
                });
                continue;
            };
            if let Some(validator) = &handler.validator
                && let Err(err) = validator(&update.args)
            {
                trace!(update = %update.name, "Update rejected by validator");
                self.ctx.emit(Command::RejectUpdate {
                    update_id: update.update_id,
                    failure: err.into_failure(),
                });
                continue;
            }
            let future = (handler.handler)(update.args);
            self.handlers.push((update.update_id, future));
            self.ctx.state.borrow_mut().bump();
        }
    }

    fn poll_handlers(&mut self, cx: &mut Context<'_>) {
        let mut index = 0;
        while index < self.handlers.len() {
            if let Poll::Ready(outcome) = self.handlers[index].1.as_mut().poll(cx) {
                let (update_id, _) = self.handlers.remove(index);
                self.ctx.emit(Command::CompleteUpdate {
                    update_id,
                    outcome: outcome.map_err(WorkflowError::into_failure),
                });
            } else {
                index += 1;
            }
        }
    }

    fn poll_main(&mut self, cx: &mut Context<'_>) {
        let Some(main) = self.main.as_mut() else {
            return;
        };
        if let Poll::Ready(result) = main.as_mut().poll(cx) {
            self.main = None;
            let command = match result {
                Ok(result) => Command::CompleteWorkflow { result },
                Err(err) => Command::FailWorkflow {
                    failure: err.into_failure(),
                },
            };
            self.ctx.emit(command);
        }
    }
}

/// Replay `history` through `definition` and return the commands produced
/// by the inputs after the last recorded workflow task.
pub(crate) fn run_workflow_task(
    definition: &WorkflowDefinition,
    info: WorkflowInfo,
    history: &[HistoryEvent],
    poll_limit: usize,
) -> Result<Vec<Command>, Failure> {
    let args = match history.first() {
        Some(HistoryEvent::WorkflowStarted { args, .. }) => args.clone(),
        _ => {
            return Err(Failure::non_retryable(
                NONDETERMINISM_ERROR,
                "history does not begin with WorkflowStarted",
            ));
        }
    };

    let ctx = WorkflowContext::new(info);
    let main = definition.start(ctx.clone(), args);
    let mut machine = Machine {
        ctx,
        main: Some(main),
        handlers: Vec::new(),
        started: false,
        poll_limit: poll_limit.max(1),
    };

    let mut cursor = 0;
    for (index, batch) in split_batches(history).into_iter().enumerate() {
        for event in &batch.events {
            machine.apply(event);
        }
        machine.run_until_blocked()?;

        let emitted = machine.ctx.commands_since(cursor);
        match batch.recorded {
            Some(recorded) => {
                if emitted != recorded {
                    return Err(Failure::non_retryable(
                        NONDETERMINISM_ERROR,
                        format!(
                            "workflow task {index} recorded {recorded:?} but replay produced {emitted:?}"
                        ),
                    ));
                }
                cursor = machine.ctx.command_count();
            }
            None => return Ok(emitted),
        }
    }

    Ok(Vec::new())
}
