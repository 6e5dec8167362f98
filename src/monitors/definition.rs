/*!
 * Monitor Definitions
 * The three monitor kinds and their validation rules
 */

use crate::core::errors::{MonitorError, MonitorResult};
use crate::core::id::MonitorId;
use crate::core::limits::MAX_HISTORY_LIMIT;
use crate::core::types::ValueHistoryEntry;
use crate::graph::StructuralPattern;
use crate::predicate::{Condition, ValuePredicate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::collections::VecDeque;

/// What the engine does when a monitor triggers, beyond recording the hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorAction {
    /// Deliver a notification to registered sinks (the default)
    #[default]
    Notify,
    /// Notify and pause event evaluation until a `continue` command
    Pause,
    /// Notify and emit a log line at info level
    Log,
}

/// Monitor kind discriminator, used for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorKind {
    Structural,
    DataFlow,
    Watchpoint,
}

/// Filter for `list` operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonitorFilter {
    #[default]
    All,
    Structural,
    DataFlow,
    Watchpoint,
}

impl MonitorFilter {
    #[inline]
    pub fn accepts(&self, kind: MonitorKind) -> bool {
        match self {
            MonitorFilter::All => true,
            MonitorFilter::Structural => kind == MonitorKind::Structural,
            MonitorFilter::DataFlow => kind == MonitorKind::DataFlow,
            MonitorFilter::Watchpoint => kind == MonitorKind::Watchpoint,
        }
    }
}

/// A monitor definition. The Definition Store exclusively owns every
/// instance; evaluators only ever see cloned snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MonitorDefinition {
    /// Triggers when an event's structural context matches a graph pattern
    Structural {
        id: MonitorId,
        pattern: StructuralPattern,
        condition: Option<Condition>,
        action: MonitorAction,
        enabled: bool,
        hit_count: u64,
    },
    /// Triggers when a value's flow from a source pattern reaches a sink
    /// pattern with all tags accumulated and conditions satisfied in order
    DataFlow {
        id: MonitorId,
        source_pattern: StructuralPattern,
        sink_pattern: StructuralPattern,
        tracked_tags: BTreeSet<String>,
        intermediate_conditions: Vec<Condition>,
        action: MonitorAction,
        enabled: bool,
        hit_count: u64,
    },
    /// Records a variable's value history annotated by structural role
    Watchpoint {
        id: MonitorId,
        variable_name_pattern: String,
        context_pattern: Option<StructuralPattern>,
        change_conditions: Vec<ValuePredicate>,
        action: MonitorAction,
        enabled: bool,
        history_limit: usize,
        value_history: VecDeque<ValueHistoryEntry>,
    },
}

impl MonitorDefinition {
    #[inline]
    pub fn id(&self) -> MonitorId {
        match self {
            MonitorDefinition::Structural { id, .. }
            | MonitorDefinition::DataFlow { id, .. }
            | MonitorDefinition::Watchpoint { id, .. } => *id,
        }
    }

    #[inline]
    pub fn kind(&self) -> MonitorKind {
        match self {
            MonitorDefinition::Structural { .. } => MonitorKind::Structural,
            MonitorDefinition::DataFlow { .. } => MonitorKind::DataFlow,
            MonitorDefinition::Watchpoint { .. } => MonitorKind::Watchpoint,
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        match self {
            MonitorDefinition::Structural { enabled, .. }
            | MonitorDefinition::DataFlow { enabled, .. }
            | MonitorDefinition::Watchpoint { enabled, .. } => *enabled,
        }
    }

    pub(crate) fn set_enabled(&mut self, value: bool) {
        match self {
            MonitorDefinition::Structural { enabled, .. }
            | MonitorDefinition::DataFlow { enabled, .. }
            | MonitorDefinition::Watchpoint { enabled, .. } => *enabled = value,
        }
    }

    #[inline]
    pub fn hit_count(&self) -> u64 {
        match self {
            MonitorDefinition::Structural { hit_count, .. }
            | MonitorDefinition::DataFlow { hit_count, .. } => *hit_count,
            MonitorDefinition::Watchpoint { .. } => 0,
        }
    }

    #[inline]
    pub fn action(&self) -> MonitorAction {
        match self {
            MonitorDefinition::Structural { action, .. }
            | MonitorDefinition::DataFlow { action, .. }
            | MonitorDefinition::Watchpoint { action, .. } => *action,
        }
    }

    /// Validate a definition before it is stored. A failed validation
    /// rejects the whole definition; nothing is partially stored.
    pub fn validate(&self) -> MonitorResult<()> {
        match self {
            MonitorDefinition::Structural { pattern, .. } => {
                if pattern.is_empty() {
                    return Err(MonitorError::InvalidSpec(
                        "structural breakpoint pattern must be non-empty".into(),
                    ));
                }
            }
            MonitorDefinition::DataFlow {
                source_pattern,
                sink_pattern,
                ..
            } => {
                if source_pattern.is_empty() {
                    return Err(MonitorError::InvalidSpec(
                        "data-flow source pattern must be non-empty".into(),
                    ));
                }
                if sink_pattern.is_empty() {
                    return Err(MonitorError::InvalidSpec(
                        "data-flow sink pattern must be non-empty".into(),
                    ));
                }
            }
            MonitorDefinition::Watchpoint {
                variable_name_pattern,
                context_pattern,
                history_limit,
                ..
            } => {
                if variable_name_pattern.trim().is_empty() {
                    return Err(MonitorError::InvalidSpec(
                        "watchpoint variable name pattern must be non-empty".into(),
                    ));
                }
                if let Some(pattern) = context_pattern {
                    if pattern.is_empty() {
                        return Err(MonitorError::InvalidSpec(
                            "watchpoint context pattern, when given, must be non-empty".into(),
                        ));
                    }
                }
                if *history_limit < 1 {
                    return Err(MonitorError::InvalidSpec(
                        "watchpoint history_limit must be at least 1".into(),
                    ));
                }
                if *history_limit > MAX_HISTORY_LIMIT {
                    return Err(MonitorError::InvalidSpec(format!(
                        "watchpoint history_limit must not exceed {MAX_HISTORY_LIMIT}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Lightweight listing row returned by `list`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSummary {
    pub id: MonitorId,
    pub kind: MonitorKind,
    pub enabled: bool,
    pub hit_count: u64,
}

impl From<&MonitorDefinition> for MonitorSummary {
    fn from(def: &MonitorDefinition) -> Self {
        Self {
            id: def.id(),
            kind: def.kind(),
            enabled: def.is_enabled(),
            hit_count: def.hit_count(),
        }
    }
}
