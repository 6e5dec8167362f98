/*!
 * Evaluate Module
 * Breakpoint evaluation pass and in-flight data-flow path tracking
 */

mod breakpoints;
mod dataflow;

pub use breakpoints::BreakpointEvaluator;
pub use dataflow::{PathKey, PathStep, PathTable};

use crate::core::id::MonitorId;
use crate::core::types::Notification;
use crate::monitors::MonitorAction;

/// One monitor trigger produced by an evaluation pass
#[derive(Debug, Clone)]
pub struct Triggered {
    pub id: MonitorId,
    pub action: MonitorAction,
    pub notification: Notification,
}
