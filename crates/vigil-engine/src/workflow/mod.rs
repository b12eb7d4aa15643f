//! Workflow-side API: the context, its futures, and the replay driver.

pub mod context;
pub(crate) mod driver;
pub mod fold;
pub mod primitives;
pub mod select;

pub use context::{WorkflowContext, WorkflowInfo};
pub use driver::{NONDETERMINISM_ERROR, TASK_LIMIT_ERROR, UNKNOWN_UPDATE_ERROR};
pub use fold::{Accumulator, sum};
pub use primitives::{ActivityFuture, Condition, Recv, SignalChannel, TimerFuture};
pub use select::{Select, Selected, Selector, WorkflowEvent};
