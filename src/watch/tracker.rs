/*!
 * Watchpoint Tracker
 * Bounded value-history recording with change-condition notifications
 *
 * History is an observational record: every matching variable snapshot is
 * appended regardless of whether the change conditions fire a notification.
 */

use super::name_pattern::name_matches;
use crate::core::types::{
    EventKind, EventPayload, Notification, NotificationPayload, RuntimeEvent, ValueHistoryEntry,
};
use crate::evaluate::Triggered;
use crate::graph::{match_guarded, PatternMatcher, StructuralContext};
use crate::monitors::{DefinitionStore, MonitorDefinition, MonitorFilter};
use log::warn;
use std::sync::Arc;
use std::time::Duration;

pub struct WatchpointTracker {
    store: Arc<DefinitionStore>,
    matcher: Arc<dyn PatternMatcher>,
    match_timeout: Duration,
}

impl WatchpointTracker {
    pub fn new(
        store: Arc<DefinitionStore>,
        matcher: Arc<dyn PatternMatcher>,
        match_timeout: Duration,
    ) -> Self {
        Self {
            store,
            matcher,
            match_timeout,
        }
    }

    /// Record one event against all enabled watchpoints. Only
    /// variable-snapshot events are observed.
    pub async fn track(
        &self,
        event: &RuntimeEvent,
        context: &StructuralContext,
    ) -> Vec<Triggered> {
        if event.kind != EventKind::VariableSnapshot {
            return Vec::new();
        }
        let EventPayload::VariableSnapshot {
            variable, value, ..
        } = &event.payload
        else {
            return Vec::new();
        };

        let mut triggered = Vec::new();

        for def in self.store.enabled_snapshots(MonitorFilter::Watchpoint) {
            let MonitorDefinition::Watchpoint {
                id,
                variable_name_pattern,
                context_pattern,
                change_conditions,
                action,
                ..
            } = def
            else {
                continue;
            };

            if !name_matches(&variable_name_pattern, variable) {
                continue;
            }

            // A watchpoint without a context pattern is keyed purely by
            // variable name: it records raw values even when the event's
            // context is unresolved (then without context tags).
            if let Some(pattern) = &context_pattern {
                if context.is_unresolved() {
                    continue;
                }
                match match_guarded(self.matcher.as_ref(), context, pattern, self.match_timeout)
                    .await
                {
                    Ok(Some(_)) => {}
                    Ok(None) => continue,
                    Err(err) => {
                        warn!("context match failed for watchpoint {id}: {err}");
                        continue;
                    }
                }
            }

            let entry = ValueHistoryEntry {
                timestamp_ns: event.timestamp_ns,
                value: value.clone(),
                context_tags: context.tags.clone(),
            };
            // Append is unconditional; the returned entry is the previous
            // observation, paired atomically with this one.
            let previous = self.store.append_history(id, entry);
            let old_value = previous.map(|e| e.value);

            let all_hold = change_conditions
                .iter()
                .all(|p| p.eval(old_value.as_ref(), value, context));
            if !all_hold {
                continue;
            }

            triggered.push(Triggered {
                id,
                action,
                notification: Notification::watchpoint_update(
                    id,
                    NotificationPayload::WatchpointUpdate {
                        variable: variable.clone(),
                        old_value,
                        new_value: value.clone(),
                        context_tags: context.tags.clone(),
                    },
                ),
            });
        }

        triggered
    }
}
