/*!
 * Sentinel Engine
 * Runtime condition-evaluation engine for a program-analysis-driven debugger
 *
 * Correlates a high-rate stream of runtime events against a static
 * structural graph: structural breakpoints, data-flow breakpoints, and
 * semantic watchpoints, evaluated without blocking the instrumented
 * program and without unbounded memory growth.
 */

pub mod core;
pub mod dispatch;
pub mod engine;
pub mod evaluate;
pub mod graph;
pub mod monitors;
pub mod notify;
pub mod predicate;
pub mod trace;
pub mod watch;

// Re-export public API
pub use crate::core::{
    BuildError, DropReason, EngineConfig, EventKind, EventPayload, IngestOutcome, MonitorError,
    MonitorId, MonitorResult, Notification, NotificationKind, NotificationPayload, RuntimeEvent,
    SubscriptionId, ValueHistoryEntry, ValueId, ValueSnapshot,
};
pub use engine::{Engine, EngineBuilder, EngineStats};
pub use graph::{Bindings, ContextResolver, PatternMatcher, StructuralContext, StructuralPattern};
pub use monitors::{MonitorAction, MonitorDefinition, MonitorFilter, MonitorKind, MonitorSummary};
pub use notify::{CommandAck, ControlCommand, SinkReceiver};
pub use predicate::{Condition, ValuePredicate};
