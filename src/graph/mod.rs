/*!
 * Structural Graph Interface
 * Collaborator traits for the external graph engine, plus the timeout
 * guard every call goes through
 */

mod guard;
mod pattern;

pub use guard::{match_guarded, resolve_guarded};
pub use pattern::{Bindings, StructuralContext, StructuralPattern};

use crate::core::errors::{MatchError, ResolveError};
use crate::core::types::RuntimeEvent;
use futures::future::BoxFuture;

/// Resolves a runtime event to its structural-graph location.
/// Implemented by the external graph engine; may be slow or fail, so the
/// engine only calls it through `resolve_guarded`.
pub trait ContextResolver: Send + Sync {
    /// `Ok(None)` means the event has no structural location (not an error)
    fn resolve<'a>(
        &'a self,
        event: &'a RuntimeEvent,
    ) -> BoxFuture<'a, Result<Option<StructuralContext>, ResolveError>>;
}

/// Matches a structural context against an opaque pattern.
/// Implemented by the external graph engine; called through `match_guarded`.
pub trait PatternMatcher: Send + Sync {
    /// `Ok(Some(bindings))` on match; bindings may be empty
    fn find_match<'a>(
        &'a self,
        context: &'a StructuralContext,
        pattern: &'a StructuralPattern,
    ) -> BoxFuture<'a, Result<Option<Bindings>, MatchError>>;
}
