/*!
 * Core Module
 * Shared types, ids, errors, limits, and configuration
 */

pub mod config;
pub mod errors;
pub mod id;
pub mod limits;
pub mod types;

pub use config::EngineConfig;
pub use errors::{
    BuildError, DropReason, IngestOutcome, MatchError, MonitorError, MonitorResult, ResolveError,
};
pub use id::{MonitorId, SubscriptionId, ValueId};
pub use types::{
    EventKind, EventPayload, Notification, NotificationKind, NotificationPayload, RuntimeEvent,
    ValueHistoryEntry, ValueSnapshot,
};
