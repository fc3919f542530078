//! `CompletedEventCache` – bounded record of recently finished events.
//!
//! Answers "was X completed recently, and did it succeed?" without letting
//! completion history grow for the whole length of a long session. Entries
//! are evicted oldest-first by insertion order; re-adding an id refreshes it.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Capacity used when none is configured.
pub const DEFAULT_CACHE_CAPACITY: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedEventRecord {
    pub event_id: String,
    /// Engine clock (seconds) at completion.
    pub completed_at: f64,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
    pub oldest_timestamp: Option<f64>,
    pub newest_timestamp: Option<f64>,
}

#[derive(Debug)]
pub struct CompletedEventCache {
    capacity: usize,
    records: HashMap<String, CompletedEventRecord>,
    /// Insertion order, oldest at the front.
    order: VecDeque<String>,
}

impl CompletedEventCache {
    /// A capacity of zero disables recording.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            records: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // ------------------------------------------------------------------
    // Insertion
    // ------------------------------------------------------------------

    pub fn add(&mut self, event_id: impl Into<String>, completed_at: f64, success: bool) {
        let event_id = event_id.into();
        if self.capacity == 0 {
            return;
        }

        // A repeat addition moves the id to the newest position.
        if self.records.remove(&event_id).is_some() {
            self.order.retain(|id| id != &event_id);
        }

        while self.records.len() >= self.capacity {
            if !self.evict_oldest() {
                break;
            }
        }

        self.order.push_back(event_id.clone());
        self.records.insert(
            event_id.clone(),
            CompletedEventRecord {
                event_id,
                completed_at,
                success,
            },
        );
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn has(&self, event_id: &str) -> bool {
        self.records.contains_key(event_id)
    }

    pub fn get(&self, event_id: &str) -> Option<&CompletedEventRecord> {
        self.records.get(event_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &CompletedEventRecord> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    pub fn stats(&self) -> CacheStats {
        let timestamps = self.records.values().map(|r| r.completed_at);
        CacheStats {
            size: self.records.len(),
            capacity: self.capacity,
            oldest_timestamp: timestamps.clone().reduce(f64::min),
            newest_timestamp: timestamps.reduce(f64::max),
        }
    }

    // ------------------------------------------------------------------
    // Eviction
    // ------------------------------------------------------------------

    pub fn remove(&mut self, event_id: &str) -> Option<CompletedEventRecord> {
        let record = self.records.remove(event_id)?;
        self.order.retain(|id| id != event_id);
        Some(record)
    }

    /// Drop every record completed strictly before `cutoff`.
    /// Returns how many were evicted.
    pub fn evict_older_than(&mut self, cutoff: f64) -> usize {
        let before = self.records.len();
        self.records.retain(|_, r| r.completed_at >= cutoff);
        let records = &self.records;
        self.order.retain(|id| records.contains_key(id));
        before - self.records.len()
    }

    /// Change the capacity, evicting the oldest entries immediately if the
    /// cache is now over its bound.
    pub fn resize(&mut self, capacity: usize) {
        self.capacity = capacity;
        while self.records.len() > self.capacity {
            if !self.evict_oldest() {
                break;
            }
        }
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.order.clear();
    }

    fn evict_oldest(&mut self) -> bool {
        match self.order.pop_front() {
            Some(id) => {
                self.records.remove(&id);
                true
            }
            None => false,
        }
    }
}

impl Default for CompletedEventCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---------------------------------------------------------------
    // Bound
    // ---------------------------------------------------------------

    #[test]
    fn overfilling_keeps_most_recent_entries() {
        let mut c = CompletedEventCache::new(10);
        for i in 0..15 {
            c.add(format!("e{i}"), i as f64, true);
        }
        assert_eq!(c.len(), 10);
        for i in 0..5 {
            assert!(!c.has(&format!("e{i}")));
        }
        for i in 5..15 {
            assert!(c.has(&format!("e{i}")));
        }
    }

    #[test]
    fn default_capacity_is_twenty() {
        let c = CompletedEventCache::default();
        assert_eq!(c.capacity(), 20);
        assert!(c.is_empty());
    }

    // ---------------------------------------------------------------
    // Recency
    // ---------------------------------------------------------------

    #[test]
    fn re_adding_refreshes_recency() {
        let mut c = CompletedEventCache::new(3);
        c.add("a", 1.0, true);
        c.add("b", 2.0, true);
        c.add("c", 3.0, true);
        c.add("a", 4.0, false);
        c.add("d", 5.0, true);

        assert!(!c.has("b"), "b was the oldest after a was refreshed");
        assert!(c.has("a"));
        assert_eq!(c.get("a").map(|r| r.success), Some(false));
        let ids: Vec<_> = c.iter().map(|r| r.event_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "d"]);
    }

    // ---------------------------------------------------------------
    // Age-based eviction
    // ---------------------------------------------------------------

    #[test]
    fn evict_older_than_drops_stale_records() {
        let mut c = CompletedEventCache::new(10);
        c.add("a", 1.0, true);
        c.add("b", 5.0, true);
        c.add("c", 9.0, true);

        assert_eq!(c.evict_older_than(5.0), 1);
        assert!(!c.has("a"));
        assert_eq!(c.len(), 2);
        assert_eq!(c.iter().count(), 2);
    }

    // ---------------------------------------------------------------
    // Resize
    // ---------------------------------------------------------------

    #[test]
    fn shrinking_evicts_immediately() {
        let mut c = CompletedEventCache::new(5);
        for i in 0..5 {
            c.add(format!("e{i}"), i as f64, true);
        }
        c.resize(2);
        assert_eq!(c.len(), 2);
        assert!(c.has("e3"));
        assert!(c.has("e4"));
    }

    #[test]
    fn zero_capacity_records_nothing() {
        let mut c = CompletedEventCache::new(0);
        c.add("a", 1.0, true);
        assert!(c.is_empty());
    }

    // ---------------------------------------------------------------
    // Stats
    // ---------------------------------------------------------------

    #[test]
    fn stats_report_timestamp_span() {
        let mut c = CompletedEventCache::new(4);
        assert_eq!(c.stats().oldest_timestamp, None);

        c.add("a", 3.0, true);
        c.add("b", 7.5, false);
        let stats = c.stats();
        assert_eq!(stats.size, 2);
        assert_eq!(stats.capacity, 4);
        assert_eq!(stats.oldest_timestamp, Some(3.0));
        assert_eq!(stats.newest_timestamp, Some(7.5));
    }

    #[test]
    fn remove_and_clear() {
        let mut c = CompletedEventCache::new(4);
        c.add("a", 1.0, true);
        c.add("b", 2.0, true);
        assert!(c.remove("a").is_some());
        assert!(c.remove("a").is_none());
        c.clear();
        assert!(c.is_empty());
        assert_eq!(c.iter().count(), 0);
    }
}
