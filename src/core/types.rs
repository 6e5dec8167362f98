/*!
 * Core Types
 * Shared data model for the evaluation engine
 */

use crate::core::id::{MonitorId, ValueId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Instant;

/// Identifier of the emitting thread inside the instrumented program.
/// Events from one origin thread are evaluated in emission order.
pub type OriginThread = u64;

/// Node identifier inside the external structural graph
pub type NodeId = u64;

/// Monotonic timestamp in nanoseconds
pub type TimestampNs = u64;

/// Opaque runtime value snapshot
pub type ValueSnapshot = serde_json::Value;

/// Kind of runtime event produced by the instrumentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    CallEntry,
    CallExit,
    VariableSnapshot,
}

/// Event payload - strongly typed variants per event kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    CallEntry {
        function: String,
        args: Vec<ValueSnapshot>,
        value_id: Option<ValueId>,
        taint_tags: BTreeSet<String>,
    },
    CallExit {
        function: String,
        return_value: Option<ValueSnapshot>,
        value_id: Option<ValueId>,
        taint_tags: BTreeSet<String>,
    },
    VariableSnapshot {
        variable: String,
        value: ValueSnapshot,
        value_id: Option<ValueId>,
        taint_tags: BTreeSet<String>,
    },
}

impl EventPayload {
    /// Identity of the runtime value this event observes, if tracked
    #[inline]
    pub fn value_id(&self) -> Option<ValueId> {
        match self {
            EventPayload::CallEntry { value_id, .. }
            | EventPayload::CallExit { value_id, .. }
            | EventPayload::VariableSnapshot { value_id, .. } => *value_id,
        }
    }

    /// Taint tags carried by this event
    #[inline]
    pub fn taint_tags(&self) -> &BTreeSet<String> {
        match self {
            EventPayload::CallEntry { taint_tags, .. }
            | EventPayload::CallExit { taint_tags, .. }
            | EventPayload::VariableSnapshot { taint_tags, .. } => taint_tags,
        }
    }

    /// Variable name, for variable-snapshot payloads
    #[inline]
    pub fn variable_name(&self) -> Option<&str> {
        match self {
            EventPayload::VariableSnapshot { variable, .. } => Some(variable),
            _ => None,
        }
    }
}

/// A single event emitted by the instrumented program.
/// Immutable once created; consumed exactly once by the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeEvent {
    pub kind: EventKind,
    pub ast_node_id: NodeId,
    pub origin_thread: OriginThread,
    pub timestamp_ns: TimestampNs,
    pub payload: EventPayload,
}

impl RuntimeEvent {
    /// Create a new event stamped with the engine-local monotonic clock
    pub fn new(
        kind: EventKind,
        ast_node_id: NodeId,
        origin_thread: OriginThread,
        payload: EventPayload,
    ) -> Self {
        Self {
            kind,
            ast_node_id,
            origin_thread,
            timestamp_ns: now_ns(),
            payload,
        }
    }

    #[inline]
    pub fn value_id(&self) -> Option<ValueId> {
        self.payload.value_id()
    }
}

/// One observation recorded in a watchpoint's value history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueHistoryEntry {
    pub timestamp_ns: TimestampNs,
    pub value: ValueSnapshot,
    pub context_tags: BTreeSet<String>,
}

/// Notification kind, one per trigger class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BreakpointHit,
    WatchpointUpdate,
}

/// Payload delivered to notification sinks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NotificationPayload {
    BreakpointHit {
        event_kind: EventKind,
        ast_node_id: NodeId,
        origin_thread: OriginThread,
        bindings: crate::graph::Bindings,
        taint_tags: BTreeSet<String>,
    },
    WatchpointUpdate {
        variable: String,
        old_value: Option<ValueSnapshot>,
        new_value: ValueSnapshot,
        context_tags: BTreeSet<String>,
    },
}

/// A monitor trigger, produced once and delivered at-most-once per sink
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub monitor_id: MonitorId,
    pub kind: NotificationKind,
    pub payload: NotificationPayload,
}

impl Notification {
    pub fn breakpoint_hit(monitor_id: MonitorId, payload: NotificationPayload) -> Self {
        Self {
            monitor_id,
            kind: NotificationKind::BreakpointHit,
            payload,
        }
    }

    pub fn watchpoint_update(monitor_id: MonitorId, payload: NotificationPayload) -> Self {
        Self {
            monitor_id,
            kind: NotificationKind::WatchpointUpdate,
            payload,
        }
    }
}

/// Get current time in nanoseconds (monotonic, engine-local epoch)
#[inline]
pub fn now_ns() -> TimestampNs {
    static START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();
    let start = START.get_or_init(Instant::now);
    start.elapsed().as_nanos() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::id::ValueId;

    fn snapshot_payload(variable: &str, value: i64) -> EventPayload {
        EventPayload::VariableSnapshot {
            variable: variable.to_string(),
            value: serde_json::json!(value),
            value_id: Some(ValueId(7)),
            taint_tags: BTreeSet::new(),
        }
    }

    #[test]
    fn test_event_accessors() {
        let event = RuntimeEvent::new(EventKind::VariableSnapshot, 42, 1, snapshot_payload("x", 3));

        assert_eq!(event.kind, EventKind::VariableSnapshot);
        assert_eq!(event.value_id(), Some(ValueId(7)));
        assert_eq!(event.payload.variable_name(), Some("x"));
    }

    #[test]
    fn test_monotonic_clock() {
        let a = now_ns();
        let b = now_ns();
        assert!(b >= a);
    }
}
