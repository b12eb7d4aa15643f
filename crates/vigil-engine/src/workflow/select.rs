//! Select over several event sources.
//!
//! When more than one branch is ready in the same poll the branch declared
//! first wins. Branches that lose stay armed: a losing activity keeps its
//! result and a losing signal stays buffered for the next select.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use vigil_types::{Failure, Payload};

use crate::definition::WorkflowResult;
use crate::error::WorkflowError;
use crate::workflow::primitives::{ActivityFuture, SignalChannel, TimerFuture};

/// The input that resolved a select.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    /// A signal was taken from a channel.
    Signal {
        name: String,
        payload: Option<Payload>,
    },
    /// An activity resolved.
    ActivityDone {
        seq: u32,
        result: Result<Payload, Failure>,
    },
    /// A timer fired.
    TimerFired { seq: u32 },
}

/// Which branch won and what it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Selected {
    /// Declaration index of the winning branch.
    pub branch: usize,
    /// The consumed event.
    pub event: WorkflowEvent,
}

enum Branch {
    Signal(SignalChannel),
    Activity(ActivityFuture),
    Timer(TimerFuture),
}

/// Waits for the first of several sources.
#[derive(Default)]
pub struct Selector {
    branches: Vec<Option<Branch>>,
}

impl Selector {
    /// Empty selector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a signal channel; it may win any number of selects.
    pub fn on_signal(mut self, channel: &SignalChannel) -> Self {
        self.branches.push(Some(Branch::Signal(channel.clone())));
        self
    }

    /// Add an activity; it wins at most once.
    pub fn on_activity(mut self, future: ActivityFuture) -> Self {
        self.branches.push(Some(Branch::Activity(future)));
        self
    }

    /// Add a timer; it wins at most once.
    pub fn on_timer(mut self, future: TimerFuture) -> Self {
        self.branches.push(Some(Branch::Timer(future)));
        self
    }

    /// Number of branches that can still win.
    pub fn pending(&self) -> usize {
        self.branches.iter().filter(|b| b.is_some()).count()
    }

    /// Wait for the next event.
    pub fn select(&mut self) -> Select<'_> {
        Select { selector: self }
    }

    fn poll_ready(&mut self) -> Option<Selected> {
        for (index, slot) in self.branches.iter_mut().enumerate() {
            let event = match slot {
                Some(Branch::Signal(channel)) => {
                    channel.try_recv().map(|payload| WorkflowEvent::Signal {
                        name: channel.name().to_string(),
                        payload,
                    })
                }
                Some(Branch::Activity(future)) => {
                    future.try_take().map(|result| WorkflowEvent::ActivityDone {
                        seq: future.seq(),
                        result,
                    })
                }
                Some(Branch::Timer(future)) => future
                    .try_fire()
                    .then(|| WorkflowEvent::TimerFired { seq: future.seq() }),
                None => None,
            };
            if let Some(event) = event {
                if !matches!(event, WorkflowEvent::Signal { .. }) {
                    *slot = None;
                }
                return Some(Selected {
                    branch: index,
                    event,
                });
            }
        }
        None
    }
}

/// Future returned by [`Selector::select`].
pub struct Select<'a> {
    selector: &'a mut Selector,
}

impl Future for Select<'_> {
    type Output = WorkflowResult<Selected>;

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.selector.pending() == 0 {
            return Poll::Ready(Err(WorkflowError::application(
                "SelectorExhausted",
                "select called with no pending branches",
            )));
        }
        match self.selector.poll_ready() {
            Some(selected) => Poll::Ready(Ok(selected)),
            None => Poll::Pending,
        }
    }
}
