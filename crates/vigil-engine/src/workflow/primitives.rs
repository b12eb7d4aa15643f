//! Futures handed out by [`WorkflowContext`](super::WorkflowContext).
//!
//! None of these register wakers: the driver re-polls every live future
//! after each input it applies, so readiness is simply "the input is in the
//! shared state".

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use vigil_types::{Failure, Payload};

use crate::workflow::context::WorkflowState;

/// Result of a scheduled activity.
pub struct ActivityFuture {
    state: Rc<RefCell<WorkflowState>>,
    seq: u32,
}

impl ActivityFuture {
    pub(crate) fn new(state: Rc<RefCell<WorkflowState>>, seq: u32) -> Self {
        Self { state, seq }
    }

    /// Sequence number of the schedule command.
    pub fn seq(&self) -> u32 {
        self.seq
    }

    pub(crate) fn try_take(&self) -> Option<Result<Payload, Failure>> {
        let mut state = self.state.borrow_mut();
        let result = state.activity_results.remove(&self.seq)?;
        state.bump();
        Some(result)
    }
}

impl Future for ActivityFuture {
    type Output = Result<Payload, Failure>;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.try_take() {
            Some(result) => Poll::Ready(result),
            None => Poll::Pending,
        }
    }
}

/// A durable timer.
pub struct TimerFuture {
    state: Rc<RefCell<WorkflowState>>,
    seq: u32,
}

impl TimerFuture {
    pub(crate) fn new(state: Rc<RefCell<WorkflowState>>, seq: u32) -> Self {
        Self { state, seq }
    }

    /// Sequence number of the start command.
    pub fn seq(&self) -> u32 {
        self.seq
    }

    pub(crate) fn try_fire(&self) -> bool {
        let mut state = self.state.borrow_mut();
        if state.fired_timers.remove(&self.seq) {
            state.bump();
            true
        } else {
            false
        }
    }
}

impl Future for TimerFuture {
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        if self.try_fire() {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

/// Receiving side of a named signal channel.
#[derive(Clone)]
pub struct SignalChannel {
    state: Rc<RefCell<WorkflowState>>,
    name: String,
}

impl SignalChannel {
    pub(crate) fn new(state: Rc<RefCell<WorkflowState>>, name: &str) -> Self {
        Self {
            state,
            name: name.to_string(),
        }
    }

    /// Signal name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Take the oldest buffered signal without waiting.
    ///
    /// The outer `Option` is `None` when nothing is buffered; the inner one
    /// is the signal's optional payload.
    pub fn try_recv(&self) -> Option<Option<Payload>> {
        let mut state = self.state.borrow_mut();
        let payload = state.signals.get_mut(&self.name)?.pop_front()?;
        state.bump();
        Some(payload)
    }

    /// Wait for the next signal.
    pub fn recv(&self) -> Recv {
        Recv {
            channel: self.clone(),
        }
    }
}

/// Future returned by [`SignalChannel::recv`].
pub struct Recv {
    channel: SignalChannel,
}

impl Future for Recv {
    type Output = Option<Payload>;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.channel.try_recv() {
            Some(payload) => Poll::Ready(payload),
            None => Poll::Pending,
        }
    }
}

/// Future returned by [`WorkflowContext::wait_condition`](super::WorkflowContext::wait_condition).
pub struct Condition<F> {
    condition: F,
}

impl<F> Condition<F> {
    pub(crate) fn new(condition: F) -> Self {
        Self { condition }
    }
}

impl<F: FnMut() -> bool + Unpin> Future for Condition<F> {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        if (self.condition)() {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}
