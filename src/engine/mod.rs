/*!
 * Engine Facade
 * Wires the definition store, dispatcher, evaluators, and sink registry,
 * and exposes the control-plane and data-plane surface
 */

mod builder;

pub use builder::EngineBuilder;

use crate::core::config::EngineConfig;
use crate::core::errors::{IngestOutcome, MonitorError, MonitorResult};
use crate::core::id::{MonitorId, SubscriptionId};
use crate::core::types::{RuntimeEvent, ValueHistoryEntry, ValueSnapshot};
use crate::dispatch::{ControlState, Dispatcher};
use crate::evaluate::PathTable;
use crate::graph::StructuralPattern;
use crate::monitors::{
    DefinitionStore, MonitorAction, MonitorDefinition, MonitorFilter, MonitorSummary,
};
use crate::notify::{CommandAck, CommandEnvelope, ControlCommand, SinkReceiver, SinkRegistry};
use crate::predicate::{Condition, ValuePredicate};
use crate::watch::name_matches;
use log::{info, trace};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Aggregate data-plane statistics (spec'd surface of `get_stats`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStats {
    pub queue_depth: usize,
    pub dropped_events: u64,
    pub resolution_failures: u64,
    pub structural_monitors: usize,
    pub data_flow_monitors: usize,
    pub watchpoint_monitors: usize,
    pub total_hits: u64,
    pub sink_drops: u64,
    pub inflight_paths: usize,
}

/// The condition-evaluation engine. Create one with [`EngineBuilder`];
/// construction spawns the worker pool, so it must happen inside a tokio
/// runtime.
pub struct Engine {
    store: Arc<DefinitionStore>,
    dispatcher: Arc<Dispatcher>,
    sinks: Arc<SinkRegistry>,
    paths: Arc<PathTable>,
    control: Arc<ControlState>,
    background: Mutex<Vec<JoinHandle<()>>>,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub(crate) fn assemble(
        store: Arc<DefinitionStore>,
        dispatcher: Arc<Dispatcher>,
        sinks: Arc<SinkRegistry>,
        paths: Arc<PathTable>,
        control: Arc<ControlState>,
        command_rx: mpsc::UnboundedReceiver<CommandEnvelope>,
        config: &EngineConfig,
    ) -> Self {
        let command_loop = tokio::spawn(run_command_loop(
            command_rx,
            Arc::clone(&store),
            Arc::clone(&dispatcher),
            Arc::clone(&control),
        ));
        let sweeper = tokio::spawn(run_expiry_sweeper(
            Arc::clone(&paths),
            Arc::clone(&control),
            config.sweep_interval,
        ));

        Self {
            store,
            dispatcher,
            sinks,
            paths,
            control,
            background: Mutex::new(vec![command_loop, sweeper]),
        }
    }

    // ---- control plane ----------------------------------------------------

    /// Define a structural breakpoint
    pub fn set_structural_breakpoint(
        &self,
        pattern: StructuralPattern,
        condition: Option<Condition>,
        action: MonitorAction,
    ) -> MonitorResult<MonitorId> {
        self.store.insert(MonitorDefinition::Structural {
            id: MonitorId::generate(),
            pattern,
            condition,
            action,
            enabled: true,
            hit_count: 0,
        })
    }

    /// Define a data-flow breakpoint
    pub fn set_data_flow_breakpoint(
        &self,
        source_pattern: StructuralPattern,
        sink_pattern: StructuralPattern,
        tracked_tags: BTreeSet<String>,
        intermediate_conditions: Vec<Condition>,
        action: MonitorAction,
    ) -> MonitorResult<MonitorId> {
        self.store.insert(MonitorDefinition::DataFlow {
            id: MonitorId::generate(),
            source_pattern,
            sink_pattern,
            tracked_tags,
            intermediate_conditions,
            action,
            enabled: true,
            hit_count: 0,
        })
    }

    /// Define a semantic watchpoint. `context_pattern: None` keys the
    /// watchpoint purely by variable name.
    pub fn set_semantic_watchpoint(
        &self,
        variable_name_pattern: impl Into<String>,
        context_pattern: Option<StructuralPattern>,
        change_conditions: Vec<ValuePredicate>,
        history_limit: usize,
        action: MonitorAction,
    ) -> MonitorResult<MonitorId> {
        self.store.insert(MonitorDefinition::Watchpoint {
            id: MonitorId::generate(),
            variable_name_pattern: variable_name_pattern.into(),
            context_pattern,
            change_conditions,
            action,
            enabled: true,
            history_limit,
            value_history: VecDeque::new(),
        })
    }

    /// Remove a monitor; also discards its in-flight data-flow paths
    pub fn remove(&self, id: MonitorId) -> MonitorResult<()> {
        self.store.remove(id)?;
        self.paths.remove_monitor(id);
        info!("monitor {id} removed");
        Ok(())
    }

    /// Enable or disable a monitor. Takes effect for evaluations that start
    /// after the change; in-flight passes complete on their snapshot.
    pub fn set_enabled(&self, id: MonitorId, enabled: bool) -> MonitorResult<()> {
        self.store.set_enabled(id, enabled)
    }

    pub fn list(&self, filter: MonitorFilter) -> Vec<MonitorSummary> {
        self.store.list(filter)
    }

    pub fn get_details(&self, id: MonitorId) -> MonitorResult<MonitorDefinition> {
        self.store.get(id).ok_or(MonitorError::NotFound(id))
    }

    pub fn get_watchpoint_history(
        &self,
        id: MonitorId,
        limit: Option<usize>,
    ) -> MonitorResult<Vec<ValueHistoryEntry>> {
        self.store.watchpoint_history(id, limit)
    }

    pub fn get_stats(&self) -> EngineStats {
        let (structural, data_flow, watchpoint) = self.store.enabled_counts();
        EngineStats {
            queue_depth: self.dispatcher.queue_depth(),
            dropped_events: self.dispatcher.dropped_events(),
            resolution_failures: self.dispatcher.resolution_failures(),
            structural_monitors: structural,
            data_flow_monitors: data_flow,
            watchpoint_monitors: watchpoint,
            total_hits: self.store.total_hits(),
            sink_drops: self.sinks.total_dropped(),
            inflight_paths: self.paths.len(),
        }
    }

    // ---- data plane ---------------------------------------------------------

    /// Accept one runtime event. Wait-free for the caller.
    #[inline]
    pub fn ingest(&self, event: RuntimeEvent) -> IngestOutcome {
        self.dispatcher.ingest(event)
    }

    // ---- notification egress ------------------------------------------------

    pub fn register_sink(&self) -> (SubscriptionId, SinkReceiver) {
        self.sinks.register()
    }

    pub fn unregister_sink(&self, id: SubscriptionId) -> bool {
        self.sinks.unregister(id)
    }

    // ---- execution control ----------------------------------------------------

    /// Pause evaluation (same effect as a sink sending `Pause`)
    pub fn pause(&self) {
        self.control.pause();
    }

    /// Resume evaluation
    pub fn resume(&self) {
        self.control.resume();
        self.dispatcher.wake_all();
    }

    /// While paused, let exactly one event through
    pub fn step(&self) {
        self.control.grant_step();
        self.dispatcher.wake_all();
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.control.is_paused()
    }

    /// Stop accepting events, drain workers, and stop background tasks
    pub async fn shutdown(&self) {
        self.dispatcher.shutdown().await;
        for handle in std::mem::take(&mut *self.background.lock()) {
            handle.abort();
        }
        info!("engine shut down");
    }
}

/// Serve control commands from sinks, acknowledging each asynchronously
async fn run_command_loop(
    mut command_rx: mpsc::UnboundedReceiver<CommandEnvelope>,
    store: Arc<DefinitionStore>,
    dispatcher: Arc<Dispatcher>,
    control: Arc<ControlState>,
) {
    while let Some(envelope) = command_rx.recv().await {
        let ack = match envelope.command {
            ControlCommand::Pause => {
                control.pause();
                CommandAck::Done
            }
            ControlCommand::Continue => {
                control.resume();
                dispatcher.wake_all();
                CommandAck::Done
            }
            ControlCommand::Step => {
                control.grant_step();
                dispatcher.wake_all();
                CommandAck::Done
            }
            ControlCommand::Inspect {
                variable,
                monitor_id,
            } => inspect(&store, &variable, monitor_id),
        };
        // A sink that gave up waiting is not an error
        let _ = envelope.ack.send(ack);
    }
}

fn inspect(store: &DefinitionStore, variable: &str, monitor_id: MonitorId) -> CommandAck {
    match store.get(monitor_id) {
        Some(MonitorDefinition::Watchpoint {
            variable_name_pattern,
            value_history,
            ..
        }) => {
            if !name_matches(&variable_name_pattern, variable) {
                return CommandAck::Rejected {
                    reason: format!(
                        "watchpoint {monitor_id} does not cover variable {variable}"
                    ),
                };
            }
            CommandAck::History {
                entries: value_history.into_iter().collect(),
            }
        }
        Some(_) => CommandAck::Rejected {
            reason: format!("monitor {monitor_id} is not a watchpoint"),
        },
        None => CommandAck::Rejected {
            reason: format!("monitor {monitor_id} not found"),
        },
    }
}

/// Periodically discard in-flight data-flow paths idle past their window
async fn run_expiry_sweeper(
    paths: Arc<PathTable>,
    control: Arc<ControlState>,
    interval: std::time::Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        if control.is_shutdown() {
            break;
        }
        let purged = paths.purge_expired();
        if purged > 0 {
            trace!("expired {purged} in-flight data-flow paths");
        }
    }
}

/// Convenience for tests and embedders: the latest value a watchpoint saw
impl Engine {
    pub fn latest_value(&self, id: MonitorId) -> MonitorResult<Option<ValueSnapshot>> {
        Ok(self
            .store
            .watchpoint_history(id, Some(1))?
            .pop()
            .map(|e| e.value))
    }
}
