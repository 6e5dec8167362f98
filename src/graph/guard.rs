/*!
 * Collaborator Call Guard
 * Bounded-latency wrappers around Context Resolver and Pattern Matcher
 */

use super::{Bindings, ContextResolver, PatternMatcher, StructuralContext, StructuralPattern};
use crate::core::errors::MatchError;
use crate::core::types::RuntimeEvent;
use log::debug;
use std::time::Duration;

/// Resolve an event's structural context with a hard timeout.
/// Every failure mode (timeout, resolver error, no location) degrades to
/// the unresolved context; the caller learns whether resolution failed so
/// it can count it.
pub async fn resolve_guarded(
    resolver: &dyn ContextResolver,
    event: &RuntimeEvent,
    timeout: Duration,
) -> (StructuralContext, bool) {
    let outcome = tokio::time::timeout(timeout, resolver.resolve(event)).await;

    match outcome {
        Ok(Ok(Some(context))) => (context, false),
        Ok(Ok(None)) => (StructuralContext::unresolved(), false),
        Ok(Err(err)) => {
            debug!(
                "context resolution failed for node {}: {}",
                event.ast_node_id, err
            );
            (StructuralContext::unresolved(), true)
        }
        Err(_) => {
            debug!(
                "context resolution timed out after {}ms for node {}",
                timeout.as_millis(),
                event.ast_node_id
            );
            (StructuralContext::unresolved(), true)
        }
    }
}

/// Run a pattern match with a hard timeout. Timeout is reported as a
/// `MatchError` so the caller can log it against the owning monitor and
/// treat it as no-match for that monitor only.
pub async fn match_guarded(
    matcher: &dyn PatternMatcher,
    context: &StructuralContext,
    pattern: &StructuralPattern,
    timeout: Duration,
) -> Result<Option<Bindings>, MatchError> {
    match tokio::time::timeout(timeout, matcher.find_match(context, pattern)).await {
        Ok(result) => result,
        Err(_) => Err(MatchError::Timeout(timeout.as_millis() as u64)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ResolveError;
    use futures::future::BoxFuture;
    use futures::FutureExt;

    struct HangingResolver;

    impl ContextResolver for HangingResolver {
        fn resolve<'a>(
            &'a self,
            _event: &'a RuntimeEvent,
        ) -> BoxFuture<'a, Result<Option<StructuralContext>, ResolveError>> {
            async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(None)
            }
            .boxed()
        }
    }

    struct HangingMatcher;

    impl PatternMatcher for HangingMatcher {
        fn find_match<'a>(
            &'a self,
            _context: &'a StructuralContext,
            _pattern: &'a StructuralPattern,
        ) -> BoxFuture<'a, Result<Option<Bindings>, MatchError>> {
            async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(None)
            }
            .boxed()
        }
    }

    fn test_event() -> RuntimeEvent {
        use crate::core::types::{EventKind, EventPayload};
        RuntimeEvent::new(
            EventKind::CallEntry,
            1,
            0,
            EventPayload::CallEntry {
                function: "f".to_string(),
                args: vec![],
                value_id: None,
                taint_tags: Default::default(),
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_timeout_degrades_to_unresolved() {
        let resolver = HangingResolver;
        let event = test_event();

        let (context, failed) =
            resolve_guarded(&resolver, &event, Duration::from_millis(10)).await;

        assert!(context.is_unresolved());
        assert!(failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_match_timeout_is_reported() {
        let matcher = HangingMatcher;
        let context = StructuralContext::unresolved();
        let pattern = StructuralPattern::new("p");

        let result = match_guarded(&matcher, &context, &pattern, Duration::from_millis(10)).await;

        assert!(matches!(result, Err(MatchError::Timeout(_))));
    }
}
