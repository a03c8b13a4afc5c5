//! Windowed history tracking
//!
//! Bounded buffers for the activity feed and per-node trend charts, kept in
//! timestamp order. Adding to a full buffer silently evicts the oldest entry.

use serde::Serialize;
use std::collections::{HashMap, VecDeque};

use crate::config::defaults::{ACTIVITY_LOG_CAPACITY, NODE_ACTIVITY_CAPACITY, NODE_HISTORY_CAPACITY};
use crate::types::{ActivityEntry, HistoricalPoint};

/// Fixed-capacity buffer. Entries are stored oldest → newest by key.
#[derive(Debug, Clone)]
pub struct BoundedLog<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedLog<T> {
    /// Create an empty log. A capacity of 0 is raised to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Insert in ascending `key` order, after any entries with an equal key.
    /// When full the oldest entry is evicted, which may be the new one.
    pub fn insert_by_key<K: Ord>(&mut self, entry: T, key: impl Fn(&T) -> K) {
        let k = key(&entry);
        let at = self.entries.partition_point(|e| key(e) <= k);
        self.entries.insert(at, entry);
        if self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first.
    pub fn chronological(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.entries.iter()
    }

    /// Newest first.
    pub fn newest_first(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().rev()
    }

    pub fn latest(&self) -> Option<&T> {
        self.entries.back()
    }
}

impl<T: Clone> BoundedLog<T> {
    pub fn to_chronological_vec(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }

    pub fn to_newest_first_vec(&self) -> Vec<T> {
        self.entries.iter().rev().cloned().collect()
    }
}

/// Capacities for the three log families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HistoryCapacities {
    pub activity: usize,
    pub node_activity: usize,
    pub node_history: usize,
}

impl Default for HistoryCapacities {
    fn default() -> Self {
        Self {
            activity: ACTIVITY_LOG_CAPACITY,
            node_activity: NODE_ACTIVITY_CAPACITY,
            node_history: NODE_HISTORY_CAPACITY,
        }
    }
}

impl Default for HistoryTracker {
    fn default() -> Self {
        Self::new(HistoryCapacities::default())
    }
}

/// Activity feed plus per-node buffers.
///
/// Not internally synchronized: the owner wraps it in a lock. Entries are
/// ordered by their own timestamp, so a reading whose detection finished late
/// still lands in its chronological slot.
#[derive(Debug, Clone)]
pub struct HistoryTracker {
    capacities: HistoryCapacities,
    activity: BoundedLog<ActivityEntry>,
    node_activity: HashMap<String, BoundedLog<ActivityEntry>>,
    node_points: HashMap<String, BoundedLog<HistoricalPoint>>,
}

impl HistoryTracker {
    pub fn new(capacities: HistoryCapacities) -> Self {
        Self {
            capacities,
            activity: BoundedLog::new(capacities.activity),
            node_activity: HashMap::new(),
            node_points: HashMap::new(),
        }
    }

    pub const fn capacities(&self) -> HistoryCapacities {
        self.capacities
    }

    /// Record one processed reading for `entry.node_id`.
    pub fn record(&mut self, entry: ActivityEntry, point: HistoricalPoint) {
        let node_id = entry.node_id.clone();
        let capacities = self.capacities;

        self.node_activity
            .entry(node_id.clone())
            .or_insert_with(|| BoundedLog::new(capacities.node_activity))
            .insert_by_key(entry.clone(), |e| e.timestamp);
        self.node_points
            .entry(node_id)
            .or_insert_with(|| BoundedLog::new(capacities.node_history))
            .insert_by_key(point, |p| p.timestamp);
        self.activity.insert_by_key(entry, |e| e.timestamp);
    }

    /// Global activity feed, newest first.
    pub fn recent_activity(&self) -> Vec<ActivityEntry> {
        self.activity.to_newest_first_vec()
    }

    /// Activity for one node, newest first.
    pub fn node_activity(&self, node_id: &str) -> Vec<ActivityEntry> {
        self.node_activity
            .get(node_id)
            .map(BoundedLog::to_newest_first_vec)
            .unwrap_or_default()
    }

    /// Trend-chart points for one node, oldest first.
    pub fn node_history(&self, node_id: &str) -> Vec<HistoricalPoint> {
        self.node_points
            .get(node_id)
            .map(BoundedLog::to_chronological_vec)
            .unwrap_or_default()
    }

    pub fn latest_point(&self, node_id: &str) -> Option<&HistoricalPoint> {
        self.node_points.get(node_id).and_then(BoundedLog::latest)
    }

    pub fn tracked_nodes(&self) -> usize {
        self.node_points.len()
    }
}
