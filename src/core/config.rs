/*!
 * Engine Configuration
 * Tunable parameters with sane defaults from core::limits
 */

use crate::core::limits;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Engine-wide configuration. All fields default from `core::limits`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capacity of each shard of the bounded event queue
    pub queue_capacity: usize,
    /// Number of dispatch workers (one queue shard per worker)
    pub workers: usize,
    /// Inactivity window after which an in-flight data-flow path expires
    pub inflight_ttl: Duration,
    /// Interval between expiry sweeps of the in-flight path table
    pub sweep_interval: Duration,
    /// Timeout for Context Resolver calls
    pub resolve_timeout: Duration,
    /// Timeout for Pattern Matcher calls
    pub match_timeout: Duration,
    /// Bounded buffer size per notification sink
    pub sink_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: limits::DEFAULT_QUEUE_CAPACITY,
            workers: limits::DEFAULT_WORKERS,
            inflight_ttl: limits::DEFAULT_INFLIGHT_TTL,
            sweep_interval: limits::DEFAULT_SWEEP_INTERVAL,
            resolve_timeout: limits::DEFAULT_RESOLVE_TIMEOUT,
            match_timeout: limits::DEFAULT_MATCH_TIMEOUT,
            sink_buffer: limits::DEFAULT_SINK_BUFFER,
        }
    }
}

impl EngineConfig {
    /// Clamp out-of-range values instead of erroring; a zero worker count
    /// or queue capacity would deadlock the data plane.
    pub fn normalized(mut self) -> Self {
        if self.workers == 0 {
            self.workers = 1;
        }
        if self.queue_capacity == 0 {
            self.queue_capacity = 1;
        }
        if self.sink_buffer == 0 {
            self.sink_buffer = 1;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_sane() {
        let config = EngineConfig::default();
        assert!(config.workers >= 1);
        assert!(config.queue_capacity >= 1);
        assert!(config.inflight_ttl > Duration::ZERO);
    }

    #[test]
    fn test_normalized_clamps_zeroes() {
        let config = EngineConfig {
            workers: 0,
            queue_capacity: 0,
            sink_buffer: 0,
            ..Default::default()
        }
        .normalized();

        assert_eq!(config.workers, 1);
        assert_eq!(config.queue_capacity, 1);
        assert_eq!(config.sink_buffer, 1);
    }
}
