/*!
 * Control Commands
 * Commands sinks send back to the engine, acknowledged asynchronously
 */

use crate::core::id::MonitorId;
use crate::core::types::ValueHistoryEntry;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// Command a registered sink may send to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ControlCommand {
    /// Stop dequeueing events; the queue absorbs and then sheds oldest
    Pause,
    /// Resume normal evaluation
    Continue,
    /// While paused, let exactly one event through
    Step,
    /// Read a watchpoint's recorded history for one variable
    Inspect {
        variable: String,
        monitor_id: MonitorId,
    },
}

/// Asynchronous acknowledgement for a control command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "ack", rename_all = "snake_case")]
pub enum CommandAck {
    Done,
    History { entries: Vec<ValueHistoryEntry> },
    Rejected { reason: String },
}

/// A command paired with its reply channel
pub(crate) struct CommandEnvelope {
    pub command: ControlCommand,
    pub ack: oneshot::Sender<CommandAck>,
}
