/*!
 * In-Flight Path Table
 * Partial progress of data-flow breakpoints, keyed per tracked value
 *
 * A path starts when an event matches a breakpoint's source pattern and
 * ends when it matches the sink pattern with every intermediate condition
 * satisfied in order and all tracked taint tags accumulated. A failed
 * intermediate condition poisons the path permanently; poisoned paths are
 * retained until expiry so they cannot be silently restarted mid-window.
 */

use crate::core::id::{MonitorId, ValueId};
use crate::core::types::RuntimeEvent;
use crate::graph::StructuralContext;
use crate::predicate::Condition;
use dashmap::DashMap;
use log::trace;
use std::collections::BTreeSet;
use std::time::{Duration, Instant};

/// Key of one in-flight path
pub type PathKey = (MonitorId, ValueId);

#[derive(Debug, Clone)]
struct InFlightPath {
    /// How many intermediate conditions have held so far
    satisfied: usize,
    /// Taint tags accumulated from events and contexts along the path
    seen_tags: BTreeSet<String>,
    /// Set when an intermediate condition failed; the path is dead
    poisoned: bool,
    last_activity: Instant,
}

/// What an event did to an existing path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    /// No path exists for this key
    NoPath,
    /// The path was poisoned earlier and ignores further events
    Poisoned,
    /// The path advanced (or merely accumulated tags). `sink_ready` is true
    /// when every condition is satisfied and all tracked tags are present,
    /// so a sink-pattern match would complete the path.
    Advanced { sink_ready: bool },
    /// This event failed the next pending condition; the path is now dead
    Killed,
}

/// Concurrent table of in-flight paths with bounded-inactivity expiry
pub struct PathTable {
    paths: DashMap<PathKey, InFlightPath, ahash::RandomState>,
    ttl: Duration,
}

impl PathTable {
    pub fn new(ttl: Duration) -> Self {
        Self {
            paths: DashMap::with_hasher(ahash::RandomState::new()),
            ttl,
        }
    }

    /// Start a path for a source-pattern match. If a live path already
    /// exists the tags merge into it; a poisoned path stays dead.
    pub fn start(&self, key: PathKey, tags: BTreeSet<String>) {
        self.paths
            .entry(key)
            .and_modify(|path| {
                if !path.poisoned {
                    path.seen_tags.extend(tags.iter().cloned());
                    path.last_activity = Instant::now();
                }
            })
            .or_insert_with(|| InFlightPath {
                satisfied: 0,
                seen_tags: tags,
                poisoned: false,
                last_activity: Instant::now(),
            });
    }

    /// Apply one event to an existing path: merge tags, attempt the next
    /// pending condition, and report whether the path is ready for a sink
    /// match. The whole step runs under the entry lock and never awaits.
    pub fn step(
        &self,
        key: PathKey,
        conditions: &[Condition],
        tracked_tags: &BTreeSet<String>,
        event: &RuntimeEvent,
        context: &StructuralContext,
    ) -> PathStep {
        let Some(mut path) = self.paths.get_mut(&key) else {
            return PathStep::NoPath;
        };

        if path.poisoned {
            // Dead paths do not refresh activity; they age out silently.
            return PathStep::Poisoned;
        }

        path.last_activity = Instant::now();
        path.seen_tags
            .extend(event.payload.taint_tags().iter().cloned());
        path.seen_tags.extend(context.tags.iter().cloned());

        if path.satisfied < conditions.len() {
            let next = &conditions[path.satisfied];
            if next.eval(&Default::default(), event, context) {
                path.satisfied += 1;
            } else {
                path.poisoned = true;
                trace!(
                    "in-flight path {:?} killed at condition {}",
                    key,
                    path.satisfied
                );
                return PathStep::Killed;
            }
        }

        let sink_ready = path.satisfied == conditions.len()
            && tracked_tags.iter().all(|t| path.seen_tags.contains(t));
        PathStep::Advanced { sink_ready }
    }

    /// Tags accumulated so far (for the hit notification)
    pub fn seen_tags(&self, key: PathKey) -> BTreeSet<String> {
        self.paths
            .get(&key)
            .map(|p| p.seen_tags.clone())
            .unwrap_or_default()
    }

    /// Complete a path after a sink match; returns false if it vanished
    /// (expired or removed) in the meantime.
    pub fn complete(&self, key: PathKey) -> bool {
        self.paths.remove(&key).is_some()
    }

    /// Discard every path owned by a removed breakpoint
    pub fn remove_monitor(&self, id: MonitorId) {
        self.paths.retain(|key, _| key.0 != id);
    }

    /// Silently discard paths idle past the inactivity window
    pub fn purge_expired(&self) -> usize {
        let before = self.paths.len();
        let ttl = self.ttl;
        self.paths
            .retain(|_, path| path.last_activity.elapsed() < ttl);
        before - self.paths.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
