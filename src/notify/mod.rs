/*!
 * Notify Module
 * Notification fan-out and the sink-to-engine command channel
 */

mod command;
mod sink;

pub use command::{CommandAck, ControlCommand};
pub(crate) use command::CommandEnvelope;
pub use sink::{SinkReceiver, SinkRegistry};
