/*!
 * Event Dispatcher
 * Ingress for the runtime event stream
 *
 * Events are sharded by origin thread across a pool of worker tasks; one
 * worker per shard keeps per-origin-thread emission order end-to-end while
 * shards evaluate in parallel. The emitting program never waits on
 * evaluation: ingest is a wait-free enqueue.
 */

use super::queue::{EventShard, QueueCounters};
use crate::core::config::EngineConfig;
use crate::core::errors::{DropReason, IngestOutcome};
use crate::core::limits::WORKER_PARK_TIMEOUT;
use crate::core::types::RuntimeEvent;
use crate::evaluate::BreakpointEvaluator;
use crate::graph::{resolve_guarded, ContextResolver};
use crate::monitors::MonitorAction;
use crate::notify::SinkRegistry;
use crate::watch::WatchpointTracker;
use log::{info, warn};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Pause/step/shutdown flags shared between workers and the command loop
#[derive(Debug, Default)]
pub struct ControlState {
    paused: AtomicBool,
    step_credits: AtomicU64,
    shutdown: AtomicBool,
}

impl ControlState {
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        self.step_credits.store(0, Ordering::SeqCst);
    }

    /// Allow exactly one more event through while paused
    pub fn grant_step(&self) {
        self.step_credits.fetch_add(1, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    #[inline]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    pub fn begin_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    fn take_step_credit(&self) -> bool {
        self.step_credits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |credits| {
                credits.checked_sub(1)
            })
            .is_ok()
    }

    fn return_step_credit(&self) {
        self.step_credits.fetch_add(1, Ordering::SeqCst);
    }
}

/// Everything a worker task needs to process one event
struct WorkerContext {
    shard: Arc<EventShard>,
    resolver: Arc<dyn ContextResolver>,
    breakpoints: Arc<BreakpointEvaluator>,
    tracker: Arc<WatchpointTracker>,
    sinks: Arc<SinkRegistry>,
    control: Arc<ControlState>,
    config: EngineConfig,
    resolution_failures: Arc<AtomicU64>,
}

/// Event stream ingress and worker pool
pub struct Dispatcher {
    shards: Vec<Arc<EventShard>>,
    shard_hasher: ahash::RandomState,
    counters: Arc<QueueCounters>,
    resolution_failures: Arc<AtomicU64>,
    control: Arc<ControlState>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Dispatcher {
    /// Build the shard array and spawn one worker task per shard
    pub fn spawn(
        config: EngineConfig,
        resolver: Arc<dyn ContextResolver>,
        breakpoints: Arc<BreakpointEvaluator>,
        tracker: Arc<WatchpointTracker>,
        sinks: Arc<SinkRegistry>,
        control: Arc<ControlState>,
    ) -> Self {
        let counters = Arc::new(QueueCounters::default());
        let resolution_failures = Arc::new(AtomicU64::new(0));

        let shards: Vec<Arc<EventShard>> = (0..config.workers)
            .map(|_| Arc::new(EventShard::new(config.queue_capacity, Arc::clone(&counters))))
            .collect();

        let workers = shards
            .iter()
            .map(|shard| {
                let ctx = WorkerContext {
                    shard: Arc::clone(shard),
                    resolver: Arc::clone(&resolver),
                    breakpoints: Arc::clone(&breakpoints),
                    tracker: Arc::clone(&tracker),
                    sinks: Arc::clone(&sinks),
                    control: Arc::clone(&control),
                    config: config.clone(),
                    resolution_failures: Arc::clone(&resolution_failures),
                };
                tokio::spawn(run_worker(ctx))
            })
            .collect();

        info!(
            "dispatcher spawned: {} workers, {} events per shard",
            config.workers, config.queue_capacity
        );

        Self {
            shards,
            shard_hasher: ahash::RandomState::new(),
            counters,
            resolution_failures,
            control,
            workers: Mutex::new(workers),
        }
    }

    /// Accept one event from the instrumented program. Wait-free; a full
    /// shard sheds its oldest event rather than blocking the emitter.
    pub fn ingest(&self, event: RuntimeEvent) -> IngestOutcome {
        if self.control.is_shutdown() {
            return IngestOutcome::Dropped(DropReason::ShuttingDown);
        }
        let shard = self.shard_for(event.origin_thread);
        self.shards[shard].push(event)
    }

    #[inline]
    fn shard_for(&self, origin_thread: u64) -> usize {
        (self.shard_hasher.hash_one(origin_thread) as usize) % self.shards.len()
    }

    /// Total events currently queued across all shards
    pub fn queue_depth(&self) -> usize {
        self.shards.iter().map(|s| s.len()).sum()
    }

    #[inline]
    pub fn dropped_events(&self) -> u64 {
        self.counters.dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn resolution_failures(&self) -> u64 {
        self.resolution_failures.load(Ordering::Relaxed)
    }

    /// Wake every worker so control-flag changes are observed promptly
    pub fn wake_all(&self) {
        for shard in &self.shards {
            shard.wake();
        }
    }

    /// Stop accepting events and wait for workers to drain
    pub async fn shutdown(&self) {
        self.control.begin_shutdown();
        self.wake_all();

        let workers = std::mem::take(&mut *self.workers.lock());
        for handle in workers {
            if let Err(e) = handle.await {
                warn!("dispatch worker terminated abnormally: {e}");
            }
        }
        info!("dispatcher shut down");
    }
}

/// Worker loop: dequeue, resolve context, fan out to both evaluators
async fn run_worker(ctx: WorkerContext) {
    loop {
        if ctx.control.is_shutdown() {
            break;
        }

        if ctx.control.is_paused() {
            if !ctx.control.take_step_credit() {
                ctx.shard.wait_ready(WORKER_PARK_TIMEOUT).await;
                continue;
            }
            match ctx.shard.pop() {
                Some(event) => process_event(&ctx, event).await,
                None => {
                    // Credit taken but nothing queued yet; give it back
                    ctx.control.return_step_credit();
                    ctx.shard.wait_ready(WORKER_PARK_TIMEOUT).await;
                }
            }
            continue;
        }

        match ctx.shard.pop() {
            Some(event) => process_event(&ctx, event).await,
            None => ctx.shard.wait_ready(WORKER_PARK_TIMEOUT).await,
        }
    }
}

async fn process_event(ctx: &WorkerContext, event: RuntimeEvent) {
    let span = crate::trace::span_evaluation(event.origin_thread);
    async move {
        let (context, failed) =
            resolve_guarded(ctx.resolver.as_ref(), &event, ctx.config.resolve_timeout).await;
        if failed {
            ctx.resolution_failures.fetch_add(1, Ordering::Relaxed);
        }

        // Breakpoints and watchpoints evaluate independently; neither waits
        // on the other's outcome.
        let (bp_triggers, wp_triggers) = tokio::join!(
            ctx.breakpoints.evaluate(&event, &context),
            ctx.tracker.track(&event, &context),
        );

        for triggered in bp_triggers.into_iter().chain(wp_triggers) {
            match triggered.action {
                MonitorAction::Pause => {
                    info!("monitor {} requested pause", triggered.id);
                    ctx.control.pause();
                }
                MonitorAction::Log => {
                    info!(
                        "monitor {} triggered ({:?})",
                        triggered.id, triggered.notification.kind
                    );
                }
                MonitorAction::Notify => {}
            }
            ctx.sinks.publish(triggered.notification);
        }
    }
    .instrument(span)
    .await
}
