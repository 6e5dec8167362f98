/*!
 * Watch Module
 * Semantic watchpoint tracking and variable-name matching
 */

mod name_pattern;
mod tracker;

pub use name_pattern::name_matches;
pub use tracker::WatchpointTracker;
