/*!
 * Dispatch Module
 * Bounded event ingress and the evaluation worker pool
 */

mod dispatcher;
mod queue;

pub use dispatcher::{ControlState, Dispatcher};
pub use queue::{EventShard, QueueCounters};
