/*!
 * Tracing Setup
 * Structured tracing initialization for embedders
 */

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize tracing with env-filter support.
/// Respects `RUST_LOG` (e.g. `RUST_LOG=sentinel_engine=debug`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    tracing::info!("tracing initialized");
}

/// Create a span for one evaluation pass
#[inline]
pub fn span_evaluation(origin_thread: u64) -> tracing::Span {
    tracing::span!(
        tracing::Level::DEBUG,
        "evaluation",
        origin_thread = origin_thread
    )
}
