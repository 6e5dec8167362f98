/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use crate::core::id::MonitorId;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Control-plane errors, returned synchronously to callers
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum MonitorError {
    #[error("Invalid monitor specification: {0}")]
    #[diagnostic(
        code(monitor::invalid_spec),
        help("Patterns must be non-empty and history_limit must be at least 1.")
    )]
    InvalidSpec(String),

    #[error("Monitor {0} not found")]
    #[diagnostic(
        code(monitor::not_found),
        help("The monitor may have been removed. List active monitors to check.")
    )]
    NotFound(MonitorId),
}

/// Context Resolver failures. Non-fatal: the event proceeds with an
/// unresolved context.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("context resolution timed out after {0}ms")]
    Timeout(u64),

    #[error("context resolution failed: {0}")]
    Failed(String),
}

/// Pattern Matcher failures. Non-fatal: treated as no-match for the one
/// monitor being evaluated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    #[error("pattern match timed out after {0}ms")]
    Timeout(u64),

    #[error("pattern match failed: {0}")]
    Failed(String),
}

/// Why an ingested event (or a displaced older one) was shed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// The shard queue was at capacity; the oldest queued event was
    /// discarded to admit the new one.
    QueueFull,
    /// The engine is shutting down and no longer accepts events.
    ShuttingDown,
}

/// Outcome of a data-plane ingest call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestOutcome {
    /// Enqueued without shedding anything
    Accepted,
    /// An event was dropped during this ingest (under drop-oldest, the
    /// displaced event is the casualty and the new event is enqueued)
    Dropped(DropReason),
}

impl IngestOutcome {
    #[inline]
    pub fn is_accepted(&self) -> bool {
        matches!(self, IngestOutcome::Accepted)
    }
}

/// Engine construction errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum BuildError {
    #[error("engine requires a context resolver")]
    #[diagnostic(
        code(engine::missing_resolver),
        help("Call EngineBuilder::with_resolver before build().")
    )]
    MissingResolver,

    #[error("engine requires a pattern matcher")]
    #[diagnostic(
        code(engine::missing_matcher),
        help("Call EngineBuilder::with_matcher before build().")
    )]
    MissingMatcher,
}

/// Common result type for control-plane operations
pub type MonitorResult<T> = Result<T, MonitorError>;
