/*!
 * Monitors Module
 * Monitor definitions and the concurrent definition store
 */

mod definition;
mod store;

pub use definition::{
    MonitorAction, MonitorDefinition, MonitorFilter, MonitorKind, MonitorSummary,
};
pub use store::DefinitionStore;
