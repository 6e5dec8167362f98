/*!
 * Definition Store
 * Concurrent keyed table of monitor definitions
 *
 * The store is the only owner of mutable monitor state. Per-id mutations
 * go through DashMap entry locks, which makes them linearizable per id
 * while operations on different ids proceed on separate shards.
 */

use super::definition::{MonitorDefinition, MonitorFilter, MonitorSummary};
use crate::core::errors::{MonitorError, MonitorResult};
use crate::core::id::MonitorId;
use crate::core::types::ValueHistoryEntry;
use dashmap::DashMap;
use log::debug;
use std::sync::atomic::{AtomicU64, Ordering};

/// Definition plus its insertion sequence number (listing order)
#[derive(Debug, Clone)]
struct StoredMonitor {
    seq: u64,
    def: MonitorDefinition,
}

/// Concurrent mapping `MonitorId -> MonitorDefinition`
pub struct DefinitionStore {
    monitors: DashMap<MonitorId, StoredMonitor>,
    insert_seq: AtomicU64,
    total_hits: AtomicU64,
}

impl DefinitionStore {
    pub fn new() -> Self {
        Self {
            monitors: DashMap::new(),
            insert_seq: AtomicU64::new(0),
            total_hits: AtomicU64::new(0),
        }
    }

    /// Validate and store a definition. Rejection leaves the store
    /// untouched; nothing is partially stored.
    pub fn insert(&self, def: MonitorDefinition) -> MonitorResult<MonitorId> {
        def.validate()?;
        let id = def.id();

        match self.monitors.entry(id) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(MonitorError::InvalidSpec(format!(
                "monitor id {id} already exists"
            ))),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let seq = self.insert_seq.fetch_add(1, Ordering::Relaxed);
                slot.insert(StoredMonitor { seq, def });
                Ok(id)
            }
        }
    }

    /// Remove a definition. Irreversible; in-flight evaluations holding a
    /// snapshot taken before the removal are allowed to complete.
    pub fn remove(&self, id: MonitorId) -> MonitorResult<()> {
        self.monitors
            .remove(&id)
            .map(|_| ())
            .ok_or(MonitorError::NotFound(id))
    }

    /// Enable or disable a monitor. Idempotent.
    pub fn set_enabled(&self, id: MonitorId, enabled: bool) -> MonitorResult<()> {
        match self.monitors.get_mut(&id) {
            Some(mut stored) => {
                stored.def.set_enabled(enabled);
                Ok(())
            }
            None => Err(MonitorError::NotFound(id)),
        }
    }

    /// Read-only snapshot of one definition, safe to inspect outside any lock
    pub fn get(&self, id: MonitorId) -> Option<MonitorDefinition> {
        self.monitors.get(&id).map(|stored| stored.def.clone())
    }

    /// Listing rows, insertion order preserved within each kind
    pub fn list(&self, filter: MonitorFilter) -> Vec<MonitorSummary> {
        let mut rows: Vec<(u64, MonitorSummary)> = self
            .monitors
            .iter()
            .filter(|entry| filter.accepts(entry.def.kind()))
            .map(|entry| (entry.seq, MonitorSummary::from(&entry.def)))
            .collect();
        rows.sort_by_key(|(seq, _)| *seq);
        rows.into_iter().map(|(_, row)| row).collect()
    }

    /// Snapshots of all enabled definitions matching the filter, in
    /// insertion order. This is the view evaluators work from.
    pub fn enabled_snapshots(&self, filter: MonitorFilter) -> Vec<MonitorDefinition> {
        let mut defs: Vec<(u64, MonitorDefinition)> = self
            .monitors
            .iter()
            .filter(|entry| entry.def.is_enabled() && filter.accepts(entry.def.kind()))
            .map(|entry| (entry.seq, entry.def.clone()))
            .collect();
        defs.sort_by_key(|(seq, _)| *seq);
        defs.into_iter().map(|(_, def)| def).collect()
    }

    /// Atomically increment a breakpoint's hit counter. A concurrent
    /// removal makes this a logged no-op, not an error.
    pub fn record_hit(&self, id: MonitorId) {
        match self.monitors.get_mut(&id) {
            Some(mut stored) => {
                match &mut stored.def {
                    MonitorDefinition::Structural { hit_count, .. }
                    | MonitorDefinition::DataFlow { hit_count, .. } => {
                        *hit_count += 1;
                    }
                    MonitorDefinition::Watchpoint { .. } => return,
                }
                self.total_hits.fetch_add(1, Ordering::Relaxed);
            }
            None => {
                debug!("hit recorded for already-removed monitor {id}");
            }
        }
    }

    /// Append a history entry to a watchpoint, evicting the oldest entry
    /// once `history_limit` is exceeded. Atomic with respect to concurrent
    /// appends on the same id (entry lock); returns the entry that was most
    /// recent before this append so callers get an exact old/new pairing.
    /// No-op if removed concurrently.
    pub fn append_history(
        &self,
        id: MonitorId,
        entry: ValueHistoryEntry,
    ) -> Option<ValueHistoryEntry> {
        match self.monitors.get_mut(&id) {
            Some(mut stored) => {
                if let MonitorDefinition::Watchpoint {
                    history_limit,
                    value_history,
                    ..
                } = &mut stored.def
                {
                    let previous = value_history.back().cloned();
                    value_history.push_back(entry);
                    while value_history.len() > *history_limit {
                        value_history.pop_front();
                    }
                    previous
                } else {
                    None
                }
            }
            None => {
                debug!("history append for already-removed monitor {id}");
                None
            }
        }
    }

    /// Most recent history entries of a watchpoint, oldest first,
    /// truncated to `limit` entries when given
    pub fn watchpoint_history(
        &self,
        id: MonitorId,
        limit: Option<usize>,
    ) -> MonitorResult<Vec<ValueHistoryEntry>> {
        let stored = self.monitors.get(&id).ok_or(MonitorError::NotFound(id))?;
        match &stored.def {
            MonitorDefinition::Watchpoint { value_history, .. } => {
                let entries: Vec<_> = value_history.iter().cloned().collect();
                match limit {
                    Some(n) if n < entries.len() => Ok(entries[entries.len() - n..].to_vec()),
                    _ => Ok(entries),
                }
            }
            _ => Err(MonitorError::NotFound(id)),
        }
    }

    /// Count of enabled monitors per kind: (structural, data-flow, watchpoint)
    pub fn enabled_counts(&self) -> (usize, usize, usize) {
        let mut counts = (0, 0, 0);
        for entry in self.monitors.iter() {
            if !entry.def.is_enabled() {
                continue;
            }
            match entry.def.kind() {
                super::definition::MonitorKind::Structural => counts.0 += 1,
                super::definition::MonitorKind::DataFlow => counts.1 += 1,
                super::definition::MonitorKind::Watchpoint => counts.2 += 1,
            }
        }
        counts
    }

    /// Sum of all hits recorded since engine start (survives removals)
    #[inline]
    pub fn total_hits(&self) -> u64 {
        self.total_hits.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }
}

impl Default for DefinitionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitors::definition::{MonitorAction, MonitorKind};
    use std::collections::{BTreeSet, VecDeque};

    fn structural(pattern: &str) -> MonitorDefinition {
        MonitorDefinition::Structural {
            id: MonitorId::generate(),
            pattern: pattern.into(),
            condition: None,
            action: MonitorAction::Notify,
            enabled: true,
            hit_count: 0,
        }
    }

    fn watchpoint(variable: &str, history_limit: usize) -> MonitorDefinition {
        MonitorDefinition::Watchpoint {
            id: MonitorId::generate(),
            variable_name_pattern: variable.to_string(),
            context_pattern: None,
            change_conditions: vec![],
            action: MonitorAction::Notify,
            enabled: true,
            history_limit,
            value_history: VecDeque::new(),
        }
    }

    fn entry(value: i64) -> ValueHistoryEntry {
        ValueHistoryEntry {
            timestamp_ns: crate::core::types::now_ns(),
            value: serde_json::json!(value),
            context_tags: BTreeSet::new(),
        }
    }

    #[test]
    fn test_insert_get_remove() {
        let store = DefinitionStore::new();
        let id = store.insert(structural("p")).unwrap();

        assert!(store.get(id).is_some());
        store.remove(id).unwrap();
        assert!(store.get(id).is_none());
        assert!(matches!(store.remove(id), Err(MonitorError::NotFound(_))));
    }

    #[test]
    fn test_insert_rejects_invalid() {
        let store = DefinitionStore::new();
        assert!(store.insert(structural("")).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_list_preserves_insertion_order() {
        let store = DefinitionStore::new();
        let a = store.insert(structural("a")).unwrap();
        let w = store.insert(watchpoint("x", 4)).unwrap();
        let b = store.insert(structural("b")).unwrap();

        let all: Vec<_> = store.list(MonitorFilter::All).iter().map(|s| s.id).collect();
        assert_eq!(all, vec![a, w, b]);

        let structs: Vec<_> = store
            .list(MonitorFilter::Structural)
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(structs, vec![a, b]);
    }

    #[test]
    fn test_record_hit_and_totals() {
        let store = DefinitionStore::new();
        let id = store.insert(structural("p")).unwrap();

        store.record_hit(id);
        store.record_hit(id);
        assert_eq!(store.get(id).unwrap().hit_count(), 2);
        assert_eq!(store.total_hits(), 2);

        // No-op after removal, counter unchanged
        store.remove(id).unwrap();
        store.record_hit(id);
        assert_eq!(store.total_hits(), 2);
    }

    #[test]
    fn test_set_enabled_idempotent() {
        let store = DefinitionStore::new();
        let id = store.insert(structural("p")).unwrap();

        store.set_enabled(id, false).unwrap();
        let once = store.get(id).unwrap().is_enabled();
        store.set_enabled(id, false).unwrap();
        let twice = store.get(id).unwrap().is_enabled();

        assert_eq!(once, twice);
        assert!(!twice);
    }

    #[test]
    fn test_history_ring_buffer() {
        let store = DefinitionStore::new();
        let id = store.insert(watchpoint("x", 3)).unwrap();

        for v in 1..=5 {
            let previous = store.append_history(id, entry(v));
            assert_eq!(
                previous.map(|e| e.value.as_i64().unwrap()),
                (v > 1).then_some(v - 1)
            );
        }

        let history = store.watchpoint_history(id, None).unwrap();
        let values: Vec<i64> = history.iter().map(|e| e.value.as_i64().unwrap()).collect();
        assert_eq!(values, vec![3, 4, 5]);

        let last_two = store.watchpoint_history(id, Some(2)).unwrap();
        let values: Vec<i64> = last_two.iter().map(|e| e.value.as_i64().unwrap()).collect();
        assert_eq!(values, vec![4, 5]);
    }

    #[test]
    fn test_enabled_snapshots_skip_disabled() {
        let store = DefinitionStore::new();
        let a = store.insert(structural("a")).unwrap();
        let b = store.insert(structural("b")).unwrap();
        store.set_enabled(a, false).unwrap();

        let snaps = store.enabled_snapshots(MonitorFilter::Structural);
        assert_eq!(snaps.len(), 1);
        assert_eq!(snaps[0].id(), b);
    }

    #[test]
    fn test_enabled_counts() {
        let store = DefinitionStore::new();
        store.insert(structural("a")).unwrap();
        store.insert(watchpoint("x", 2)).unwrap();
        let c = store.insert(structural("c")).unwrap();
        store.set_enabled(c, false).unwrap();

        assert_eq!(store.enabled_counts(), (1, 0, 1));
        assert_eq!(store.list(MonitorFilter::All).len(), 3);
        assert!(store
            .list(MonitorFilter::All)
            .iter()
            .any(|s| s.kind == MonitorKind::Watchpoint));
    }

    #[test]
    fn test_concurrent_hits_linearize() {
        use std::sync::Arc;

        let store = Arc::new(DefinitionStore::new());
        let id = store.insert(structural("p")).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        store.record_hit(id);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.get(id).unwrap().hit_count(), 800);
        assert_eq!(store.total_hits(), 800);
    }
}
