/*!
 * Event Queue
 * Bounded lock-free shard with drop-oldest admission
 *
 * One shard per worker; events are routed to a shard by origin thread, so
 * a shard's single consumer sees every origin thread it owns in emission
 * order. Enqueue is wait-free for the instrumented program.
 */

use crate::core::errors::{DropReason, IngestOutcome};
use crate::core::types::RuntimeEvent;
use crossbeam_queue::ArrayQueue;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Counters shared by all shards of one dispatcher
#[derive(Debug, Default)]
pub struct QueueCounters {
    pub enqueued: AtomicU64,
    pub dropped: AtomicU64,
}

/// One bounded shard of the event queue
pub struct EventShard {
    queue: ArrayQueue<RuntimeEvent>,
    counters: Arc<QueueCounters>,
    /// Wakes the shard's worker when an event arrives
    ready: Notify,
}

impl EventShard {
    pub fn new(capacity: usize, counters: Arc<QueueCounters>) -> Self {
        Self {
            queue: ArrayQueue::new(capacity),
            counters,
            ready: Notify::new(),
        }
    }

    /// Enqueue an event. When the shard is full the oldest queued event is
    /// displaced so the stream stays fresh; the displaced event is the drop
    /// the outcome reports.
    pub fn push(&self, event: RuntimeEvent) -> IngestOutcome {
        let displaced = self.queue.force_push(event);
        self.counters.enqueued.fetch_add(1, Ordering::Relaxed);
        self.ready.notify_one();

        match displaced {
            None => IngestOutcome::Accepted,
            Some(_) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                IngestOutcome::Dropped(DropReason::QueueFull)
            }
        }
    }

    /// Dequeue one event, if any
    #[inline]
    pub fn pop(&self) -> Option<RuntimeEvent> {
        self.queue.pop()
    }

    /// Wait until an event might be available (or the timeout elapses, so
    /// the worker can re-check control flags)
    pub async fn wait_ready(&self, timeout: std::time::Duration) {
        let _ = tokio::time::timeout(timeout, self.ready.notified()).await;
    }

    /// Wake the shard's worker without enqueuing (pause/shutdown changes)
    #[inline]
    pub fn wake(&self) {
        self.ready.notify_one();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{EventKind, EventPayload};

    fn event(n: u64) -> RuntimeEvent {
        RuntimeEvent::new(
            EventKind::CallEntry,
            n,
            0,
            EventPayload::CallEntry {
                function: format!("f{n}"),
                args: vec![],
                value_id: None,
                taint_tags: Default::default(),
            },
        )
    }

    #[test]
    fn test_push_pop_fifo() {
        let shard = EventShard::new(8, Arc::new(QueueCounters::default()));

        for n in 0..5 {
            assert!(shard.push(event(n)).is_accepted());
        }
        for n in 0..5 {
            assert_eq!(shard.pop().unwrap().ast_node_id, n);
        }
        assert!(shard.pop().is_none());
    }

    #[test]
    fn test_full_shard_drops_oldest() {
        let counters = Arc::new(QueueCounters::default());
        let shard = EventShard::new(3, Arc::clone(&counters));

        for n in 0..3 {
            assert!(shard.push(event(n)).is_accepted());
        }

        let outcome = shard.push(event(3));
        assert_eq!(
            outcome,
            IngestOutcome::Dropped(DropReason::QueueFull)
        );
        assert_eq!(counters.dropped.load(Ordering::Relaxed), 1);

        // Oldest (0) was displaced; 1, 2, 3 remain in order
        let remaining: Vec<u64> = std::iter::from_fn(|| shard.pop())
            .map(|e| e.ast_node_id)
            .collect();
        assert_eq!(remaining, vec![1, 2, 3]);
    }
}
