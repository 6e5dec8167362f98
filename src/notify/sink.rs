/*!
 * Notification Sinks
 * Fire-and-forget fan-out with a bounded buffer per sink
 *
 * A slow or unreachable sink never blocks evaluation: publish is a
 * non-blocking handoff, and a full buffer costs that sink the
 * notification (counted, surfaced through stats).
 */

use super::command::{CommandAck, CommandEnvelope, ControlCommand};
use crate::core::id::SubscriptionId;
use crate::core::types::Notification;
use dashmap::DashMap;
use log::{debug, info};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

struct SinkHandle {
    tx: flume::Sender<Notification>,
    dropped: Arc<AtomicU64>,
}

/// Consumer half of a registered sink
pub struct SinkReceiver {
    id: SubscriptionId,
    rx: flume::Receiver<Notification>,
    commands: mpsc::UnboundedSender<CommandEnvelope>,
}

impl SinkReceiver {
    #[inline]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Wait for the next notification; `None` once unregistered
    pub async fn recv(&self) -> Option<Notification> {
        self.rx.recv_async().await.ok()
    }

    /// Non-blocking poll
    pub fn try_recv(&self) -> Option<Notification> {
        self.rx.try_recv().ok()
    }

    /// Send a control command to the engine and await its acknowledgement
    pub async fn send_command(&self, command: ControlCommand) -> CommandAck {
        let (ack_tx, ack_rx) = oneshot::channel();
        let envelope = CommandEnvelope {
            command,
            ack: ack_tx,
        };
        if self.commands.send(envelope).is_err() {
            return CommandAck::Rejected {
                reason: "engine is shut down".to_string(),
            };
        }
        ack_rx.await.unwrap_or(CommandAck::Rejected {
            reason: "engine dropped the command".to_string(),
        })
    }
}

/// Registry of all currently registered sinks
pub struct SinkRegistry {
    sinks: DashMap<SubscriptionId, SinkHandle>,
    buffer: usize,
    commands: mpsc::UnboundedSender<CommandEnvelope>,
    total_dropped: AtomicU64,
}

impl SinkRegistry {
    /// Create a registry; the returned receiver feeds the engine's command
    /// loop.
    pub(crate) fn new(
        buffer: usize,
    ) -> (Self, mpsc::UnboundedReceiver<CommandEnvelope>) {
        let (commands, command_rx) = mpsc::unbounded_channel();
        (
            Self {
                sinks: DashMap::new(),
                buffer,
                commands,
                total_dropped: AtomicU64::new(0),
            },
            command_rx,
        )
    }

    /// Register a new sink and hand back its consumer half
    pub fn register(&self) -> (SubscriptionId, SinkReceiver) {
        let id = SubscriptionId::generate();
        let (tx, rx) = flume::bounded(self.buffer);
        self.sinks.insert(
            id,
            SinkHandle {
                tx,
                dropped: Arc::new(AtomicU64::new(0)),
            },
        );
        info!("notification sink {id} registered");
        (
            id,
            SinkReceiver {
                id,
                rx,
                commands: self.commands.clone(),
            },
        )
    }

    /// Remove a sink; its receiver's `recv` returns `None` afterwards
    pub fn unregister(&self, id: SubscriptionId) -> bool {
        let removed = self.sinks.remove(&id).is_some();
        if removed {
            info!("notification sink {id} unregistered");
        }
        removed
    }

    /// Deliver a notification to every registered sink, at most once each.
    /// Never blocks; a full or disconnected sink loses this notification
    /// and its drop counter grows.
    pub fn publish(&self, notification: Notification) {
        for sink in self.sinks.iter() {
            if sink.tx.try_send(notification.clone()).is_err() {
                sink.dropped.fetch_add(1, Ordering::Relaxed);
                self.total_dropped.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "sink {} dropped a {:?} notification",
                    sink.key(),
                    notification.kind
                );
            }
        }
    }

    /// Notifications lost across all sinks since engine start
    #[inline]
    pub fn total_dropped(&self) -> u64 {
        self.total_dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }
}
