/*!
 * Breakpoint Evaluator
 * Tests enabled structural and data-flow breakpoints against one
 * resolved (event, context) pair
 *
 * Each breakpoint is evaluated in isolation: a Pattern Matcher timeout or
 * error is logged against the owning monitor and treated as no-match for
 * that monitor only, never aborting the rest of the pass.
 */

use super::dataflow::{PathStep, PathTable};
use super::Triggered;
use crate::core::types::{Notification, NotificationPayload, RuntimeEvent};
use crate::graph::{match_guarded, Bindings, PatternMatcher, StructuralContext};
use crate::monitors::{DefinitionStore, MonitorDefinition, MonitorFilter};
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

pub struct BreakpointEvaluator {
    store: Arc<DefinitionStore>,
    matcher: Arc<dyn PatternMatcher>,
    paths: Arc<PathTable>,
    match_timeout: Duration,
}

impl BreakpointEvaluator {
    pub fn new(
        store: Arc<DefinitionStore>,
        matcher: Arc<dyn PatternMatcher>,
        paths: Arc<PathTable>,
        match_timeout: Duration,
    ) -> Self {
        Self {
            store,
            matcher,
            paths,
            match_timeout,
        }
    }

    /// Shared in-flight path table (the engine's expiry sweeper scans it)
    pub fn paths(&self) -> &Arc<PathTable> {
        &self.paths
    }

    /// Evaluate all enabled breakpoints against one event. Returns the
    /// triggers; hit counters are already recorded when this returns.
    pub async fn evaluate(
        &self,
        event: &RuntimeEvent,
        context: &StructuralContext,
    ) -> Vec<Triggered> {
        let mut triggered = Vec::new();

        for def in self.store.enabled_snapshots(MonitorFilter::Structural) {
            if let MonitorDefinition::Structural {
                id,
                pattern,
                condition,
                action,
                ..
            } = def
            {
                // Unresolved contexts never match structural patterns
                if context.is_unresolved() {
                    continue;
                }
                let bindings =
                    match match_guarded(self.matcher.as_ref(), context, &pattern, self.match_timeout)
                        .await
                    {
                        Ok(Some(bindings)) => bindings,
                        Ok(None) => continue,
                        Err(err) => {
                            warn!("pattern match failed for monitor {id}: {err}");
                            continue;
                        }
                    };

                if let Some(cond) = &condition {
                    if !cond.eval(&bindings, event, context) {
                        continue;
                    }
                }

                self.store.record_hit(id);
                info!("structural breakpoint {id} hit at node {}", event.ast_node_id);
                triggered.push(Triggered {
                    id,
                    action,
                    notification: Notification::breakpoint_hit(id, hit_payload(event, context, bindings)),
                });
            }
        }

        for def in self.store.enabled_snapshots(MonitorFilter::DataFlow) {
            if let MonitorDefinition::DataFlow {
                id,
                source_pattern,
                sink_pattern,
                tracked_tags,
                intermediate_conditions,
                action,
                ..
            } = def
            {
                // Only events observing an identified value participate
                let Some(value_id) = event.value_id() else {
                    continue;
                };
                let key = (id, value_id);

                let step = self.paths.step(
                    key,
                    &intermediate_conditions,
                    &tracked_tags,
                    event,
                    context,
                );

                match step {
                    PathStep::NoPath => {
                        // No path yet: a source-pattern match starts one.
                        // Unresolved contexts never match.
                        if context.is_unresolved() {
                            continue;
                        }
                        match match_guarded(
                            self.matcher.as_ref(),
                            context,
                            &source_pattern,
                            self.match_timeout,
                        )
                        .await
                        {
                            Ok(Some(_)) => {
                                let mut tags = event.payload.taint_tags().clone();
                                tags.extend(context.tags.iter().cloned());
                                self.paths.start(key, tags);
                            }
                            Ok(None) => {}
                            Err(err) => {
                                warn!("source match failed for monitor {id}: {err}");
                            }
                        }
                    }
                    PathStep::Poisoned | PathStep::Killed => {}
                    PathStep::Advanced { sink_ready: false } => {}
                    PathStep::Advanced { sink_ready: true } => {
                        if context.is_unresolved() {
                            continue;
                        }
                        match match_guarded(
                            self.matcher.as_ref(),
                            context,
                            &sink_pattern,
                            self.match_timeout,
                        )
                        .await
                        {
                            Ok(Some(bindings)) => {
                                let seen_tags = self.paths.seen_tags(key);
                                // The path may have expired between the step
                                // and the match; only a live path completes.
                                if self.paths.complete(key) {
                                    self.store.record_hit(id);
                                    info!(
                                        "data-flow breakpoint {id} hit: value {value_id} reached sink"
                                    );
                                    let mut payload = hit_payload(event, context, bindings);
                                    if let NotificationPayload::BreakpointHit {
                                        taint_tags, ..
                                    } = &mut payload
                                    {
                                        *taint_tags = seen_tags;
                                    }
                                    triggered.push(Triggered {
                                        id,
                                        action,
                                        notification: Notification::breakpoint_hit(id, payload),
                                    });
                                }
                            }
                            Ok(None) => {}
                            Err(err) => {
                                warn!("sink match failed for monitor {id}: {err}");
                            }
                        }
                    }
                }
            }
        }

        triggered
    }
}

fn hit_payload(
    event: &RuntimeEvent,
    context: &StructuralContext,
    bindings: Bindings,
) -> NotificationPayload {
    let mut taint_tags = event.payload.taint_tags().clone();
    taint_tags.extend(context.tags.iter().cloned());
    NotificationPayload::BreakpointHit {
        event_kind: event.kind,
        ast_node_id: event.ast_node_id,
        origin_thread: event.origin_thread,
        bindings,
        taint_tags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::MatchError;
    use crate::core::id::{MonitorId, ValueId};
    use crate::core::types::{EventKind, EventPayload};
    use crate::graph::StructuralPattern;
    use crate::monitors::MonitorAction;
    use crate::predicate::Condition;
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use std::collections::BTreeSet;

    /// Matcher that matches when the pattern query appears in the context
    /// tags, and errors on the magic query "boom".
    struct TagMatcher;

    impl PatternMatcher for TagMatcher {
        fn find_match<'a>(
            &'a self,
            context: &'a StructuralContext,
            pattern: &'a StructuralPattern,
        ) -> BoxFuture<'a, Result<Option<Bindings>, MatchError>> {
            async move {
                if pattern.query() == "boom" {
                    return Err(MatchError::Failed("matcher exploded".to_string()));
                }
                if context.tags.contains(pattern.query()) {
                    Ok(Some(Bindings::new()))
                } else {
                    Ok(None)
                }
            }
            .boxed()
        }
    }

    fn evaluator(store: Arc<DefinitionStore>) -> BreakpointEvaluator {
        BreakpointEvaluator::new(
            store,
            Arc::new(TagMatcher),
            Arc::new(PathTable::new(Duration::from_secs(30))),
            Duration::from_millis(50),
        )
    }

    fn tagged_context(tags: &[&str]) -> StructuralContext {
        StructuralContext::new(5, vec![1], tags.iter().map(|t| t.to_string()).collect())
    }

    fn call_event(value_id: Option<u64>) -> RuntimeEvent {
        RuntimeEvent::new(
            EventKind::CallEntry,
            5,
            0,
            EventPayload::CallEntry {
                function: "f".to_string(),
                args: vec![],
                value_id: value_id.map(ValueId),
                taint_tags: BTreeSet::new(),
            },
        )
    }

    fn structural(pattern: &str, condition: Option<Condition>) -> MonitorDefinition {
        MonitorDefinition::Structural {
            id: MonitorId::generate(),
            pattern: pattern.into(),
            condition,
            action: MonitorAction::Notify,
            enabled: true,
            hit_count: 0,
        }
    }

    fn dataflow(source: &str, sink: &str, conditions: Vec<Condition>) -> MonitorDefinition {
        MonitorDefinition::DataFlow {
            id: MonitorId::generate(),
            source_pattern: source.into(),
            sink_pattern: sink.into(),
            tracked_tags: BTreeSet::new(),
            intermediate_conditions: conditions,
            action: MonitorAction::Notify,
            enabled: true,
            hit_count: 0,
        }
    }

    #[tokio::test]
    async fn test_structural_hit_records_count() {
        let store = Arc::new(DefinitionStore::new());
        let id = store.insert(structural("entry", None)).unwrap();
        let eval = evaluator(Arc::clone(&store));

        let triggered = eval
            .evaluate(&call_event(None), &tagged_context(&["entry"]))
            .await;

        assert_eq!(triggered.len(), 1);
        assert_eq!(triggered[0].id, id);
        assert_eq!(store.get(id).unwrap().hit_count(), 1);
    }

    #[tokio::test]
    async fn test_condition_gates_trigger() {
        let store = Arc::new(DefinitionStore::new());
        let id = store
            .insert(structural(
                "entry",
                Some(Condition::FunctionIs {
                    name: "other".to_string(),
                }),
            ))
            .unwrap();
        let eval = evaluator(Arc::clone(&store));

        let triggered = eval
            .evaluate(&call_event(None), &tagged_context(&["entry"]))
            .await;

        assert!(triggered.is_empty());
        assert_eq!(store.get(id).unwrap().hit_count(), 0);
    }

    #[tokio::test]
    async fn test_unresolved_context_never_matches() {
        let store = Arc::new(DefinitionStore::new());
        store.insert(structural("entry", None)).unwrap();
        let eval = evaluator(Arc::clone(&store));

        let triggered = eval
            .evaluate(&call_event(None), &StructuralContext::unresolved())
            .await;

        assert!(triggered.is_empty());
    }

    #[tokio::test]
    async fn test_matcher_failure_is_isolated() {
        let store = Arc::new(DefinitionStore::new());
        store.insert(structural("boom", None)).unwrap();
        let ok_id = store.insert(structural("entry", None)).unwrap();
        let eval = evaluator(Arc::clone(&store));

        let triggered = eval
            .evaluate(&call_event(None), &tagged_context(&["entry", "boom-not"]))
            .await;

        // The failing monitor is skipped; the healthy one still triggers
        assert_eq!(triggered.len(), 1);
        assert_eq!(triggered[0].id, ok_id);
    }

    #[tokio::test]
    async fn test_dataflow_source_to_sink() {
        let store = Arc::new(DefinitionStore::new());
        let id = store.insert(dataflow("source", "sink", vec![])).unwrap();
        let eval = evaluator(Arc::clone(&store));

        // Source event starts the path
        let triggered = eval
            .evaluate(&call_event(Some(9)), &tagged_context(&["source"]))
            .await;
        assert!(triggered.is_empty());
        assert_eq!(eval.paths().len(), 1);

        // Sink event completes it
        let triggered = eval
            .evaluate(&call_event(Some(9)), &tagged_context(&["sink"]))
            .await;
        assert_eq!(triggered.len(), 1);
        assert_eq!(triggered[0].id, id);
        assert_eq!(store.get(id).unwrap().hit_count(), 1);
        assert!(eval.paths().is_empty());
    }

    #[tokio::test]
    async fn test_dataflow_failed_condition_discards_path() {
        let store = Arc::new(DefinitionStore::new());
        let id = store
            .insert(dataflow(
                "source",
                "sink",
                vec![Condition::FunctionIs {
                    name: "sanitize".to_string(),
                }],
            ))
            .unwrap();
        let eval = evaluator(Arc::clone(&store));

        // Source, then an event that fails the intermediate condition,
        // then a sink event: no notification.
        eval.evaluate(&call_event(Some(9)), &tagged_context(&["source"]))
            .await;
        eval.evaluate(&call_event(Some(9)), &tagged_context(&["elsewhere"]))
            .await;
        let triggered = eval
            .evaluate(&call_event(Some(9)), &tagged_context(&["sink"]))
            .await;

        assert!(triggered.is_empty());
        assert_eq!(store.get(id).unwrap().hit_count(), 0);
    }

    #[tokio::test]
    async fn test_dataflow_distinct_values_track_separately() {
        let store = Arc::new(DefinitionStore::new());
        store.insert(dataflow("source", "sink", vec![])).unwrap();
        let eval = evaluator(Arc::clone(&store));

        eval.evaluate(&call_event(Some(1)), &tagged_context(&["source"]))
            .await;
        eval.evaluate(&call_event(Some(2)), &tagged_context(&["source"]))
            .await;
        assert_eq!(eval.paths().len(), 2);

        let triggered = eval
            .evaluate(&call_event(Some(1)), &tagged_context(&["sink"]))
            .await;
        assert_eq!(triggered.len(), 1);
        assert_eq!(eval.paths().len(), 1);
    }
}
