//! Workflow history and the commands workflow code emits.
//!
//! History is the durable record of a run: every external input the workflow
//! consumed, in the order the engine accepted it, interleaved with
//! `WorkflowTaskCompleted` markers that record the commands each workflow
//! task produced. Replaying the history through the workflow code must
//! reproduce those commands exactly.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use vigil_types::{ActivityOptions, Failure, Payload, Payloads};

/// One entry in a run's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HistoryEvent {
    /// The run was submitted.
    WorkflowStarted {
        workflow_type: String,
        task_queue: String,
        args: Payloads,
    },
    /// A signal was accepted.
    SignalReceived {
        name: String,
        payload: Option<Payload>,
    },
    /// An update was accepted for processing.
    UpdateRequested {
        update_id: String,
        name: String,
        args: Payloads,
    },
    /// An activity finished successfully.
    ActivityCompleted {
        seq: u32,
        attempt: u32,
        result: Payload,
    },
    /// An activity gave up.
    ActivityFailed {
        seq: u32,
        attempt: u32,
        failure: Failure,
    },
    /// A timer fired.
    TimerFired { seq: u32 },
    /// A workflow task ran and produced these commands.
    WorkflowTaskCompleted { commands: Vec<Command> },
    /// The run closed with a result.
    WorkflowCompleted { result: Payload },
    /// The run closed with a failure.
    WorkflowFailed { failure: Failure },
    /// The run exceeded its execution timeout.
    WorkflowTimedOut,
}

impl HistoryEvent {
    /// Whether this event closes the run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            HistoryEvent::WorkflowCompleted { .. }
                | HistoryEvent::WorkflowFailed { .. }
                | HistoryEvent::WorkflowTimedOut
        )
    }
}

/// A decision produced by workflow code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Run an activity.
    ScheduleActivity {
        seq: u32,
        activity_type: String,
        args: Payloads,
        options: ActivityOptions,
    },
    /// Start a timer.
    StartTimer { seq: u32, duration: Duration },
    /// An update handler returned.
    CompleteUpdate {
        update_id: String,
        outcome: Result<Payload, Failure>,
    },
    /// An update was refused before its handler ran.
    RejectUpdate { update_id: String, failure: Failure },
    /// The workflow function returned a value.
    CompleteWorkflow { result: Payload },
    /// The workflow function returned an error.
    FailWorkflow { failure: Failure },
}

/// Count how many attempts an activity took, if it has resolved.
pub fn activity_attempts(history: &[HistoryEvent], seq: u32) -> Option<u32> {
    history.iter().find_map(|event| match event {
        HistoryEvent::ActivityCompleted {
            seq: s, attempt, ..
        }
        | HistoryEvent::ActivityFailed {
            seq: s, attempt, ..
        } if *s == seq => Some(*attempt),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_events() {
        assert!(HistoryEvent::WorkflowTimedOut.is_terminal());
        assert!(
            HistoryEvent::WorkflowCompleted {
                result: Payload::null()
            }
            .is_terminal()
        );
        assert!(!HistoryEvent::TimerFired { seq: 1 }.is_terminal());
    }

    #[test]
    fn test_activity_attempts() {
        let history = vec![
            HistoryEvent::ActivityFailed {
                seq: 2,
                attempt: 1,
                failure: Failure::new("X", "x"),
            },
            HistoryEvent::ActivityCompleted {
                seq: 1,
                attempt: 3,
                result: Payload::null(),
            },
        ];
        assert_eq!(activity_attempts(&history, 1), Some(3));
        assert_eq!(activity_attempts(&history, 2), Some(1));
        assert_eq!(activity_attempts(&history, 9), None);
    }

    #[test]
    fn test_history_serializes_tagged() {
        let event = HistoryEvent::TimerFired { seq: 4 };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "timer_fired");
        assert_eq!(value["seq"], 4);
    }
}
