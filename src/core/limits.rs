/*!
 * Engine Limits and Constants
 *
 * Centralized location for all tunable limits and thresholds.
 * All values include rationale comments explaining WHY they exist.
 */

use std::time::Duration;

/// Default per-shard event queue capacity.
/// Sized so a burst from one origin thread survives a slow matcher call
/// without shedding. [PERF] Power of 2 for ArrayQueue indexing.
pub const DEFAULT_QUEUE_CAPACITY: usize = 4096;

/// Default number of dispatch workers (= queue shards).
/// Events are sharded by origin thread, so parallelism beyond the number
/// of instrumented threads buys nothing.
pub const DEFAULT_WORKERS: usize = 4;

/// Upper bound on watchpoint history limits.
/// Histories are observational records, not storage; anything larger
/// belongs in an external sink.
pub const MAX_HISTORY_LIMIT: usize = 65_536;

/// Default inactivity window before an in-flight data-flow path expires.
/// Configurable per engine; tune to the instrumented program's tempo.
pub const DEFAULT_INFLIGHT_TTL: Duration = Duration::from_secs(30);

/// How often the expiry sweeper scans the in-flight path table
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Timeout applied to every Context Resolver call.
/// A slow resolver degrades to unresolved context, never blocks a worker.
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_millis(50);

/// Timeout applied to every Pattern Matcher call.
/// A slow matcher degrades to no-match for that one monitor.
pub const DEFAULT_MATCH_TIMEOUT: Duration = Duration::from_millis(50);

/// Bounded buffer size per notification sink.
/// A sink that falls this far behind starts losing notifications; drops
/// are counted per sink and surfaced through stats.
pub const DEFAULT_SINK_BUFFER: usize = 1024;

/// How long an idle worker parks before re-checking control flags.
/// Bounds the latency of observing pause/shutdown without busy-spinning.
pub const WORKER_PARK_TIMEOUT: Duration = Duration::from_millis(20);
