//! In-memory anomaly store
//!
//! Thread-safe via `RwLock`. Not durable; contents are regenerated by the
//! startup backfill.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::RwLock;

use super::{AnomalyStore, StoreError};
use crate::config::defaults::MOCK_STORE_CAPACITY;
use crate::types::AnomalyRecord;

pub struct MockStore {
    records: RwLock<VecDeque<AnomalyRecord>>,
    capacity: usize,
}

impl MockStore {
    /// A capacity of 0 is raised to 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            records: RwLock::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new(MOCK_STORE_CAPACITY)
    }
}

impl AnomalyStore for MockStore {
    fn record(&self, anomaly: &AnomalyRecord) -> Result<(), StoreError> {
        let mut store = self.records.write().map_err(|e| StoreError::Poisoned(e.to_string()))?;

        store.push_back(anomaly.clone());

        // Evict oldest if over limit
        while store.len() > self.capacity {
            store.pop_front();
        }

        Ok(())
    }

    fn list_since(
        &self,
        cutoff: DateTime<Utc>,
        node_id: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<AnomalyRecord>, StoreError> {
        let store = self.records.read().map_err(|e| StoreError::Poisoned(e.to_string()))?;

        let mut matches: Vec<AnomalyRecord> = store
            .iter()
            .filter(|r| r.timestamp >= cutoff)
            .filter(|r| node_id.map_or(true, |id| r.node_id == id))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        if let Some(limit) = limit {
            matches.truncate(limit);
        }
        Ok(matches)
    }

    fn len(&self) -> Result<usize, StoreError> {
        let store = self.records.read().map_err(|e| StoreError::Poisoned(e.to_string()))?;
        Ok(store.len())
    }

    fn backend_name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::record;

    #[test]
    fn test_list_newest_first_with_limit() {
        let store = MockStore::default();
        store.record(&record("CP-MOH-01", 30, 81)).unwrap();
        store.record(&record("CP-MOH-02", 10, 82)).unwrap();
        store.record(&record("CP-MOH-01", 20, 83)).unwrap();

        let list = store.list_anomalies(24, 2).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].stress_index, 82);
        assert_eq!(list[1].stress_index, 83);
    }

    #[test]
    fn test_window_excludes_old_records() {
        let store = MockStore::default();
        store.record(&record("CP-MOH-01", 60 * 30, 90)).unwrap();
        store.record(&record("CP-MOH-01", 60, 85)).unwrap();

        assert_eq!(store.list_anomalies(24, 50).unwrap().len(), 1);
        assert_eq!(store.list_anomalies(48, 50).unwrap().len(), 2);
    }

    #[test]
    fn test_for_node_filters() {
        let store = MockStore::default();
        store.record(&record("CP-MOH-01", 5, 81)).unwrap();
        store.record(&record("CP-MOH-02", 5, 82)).unwrap();
        let list = store.list_anomalies_for_node("CP-MOH-02", 24).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].node_id, "CP-MOH-02");
        assert!(store.list_anomalies_for_node("CP-MOH-09", 24).unwrap().is_empty());
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let store = MockStore::new(3);
        for i in 0..5u8 {
            store.record(&record("CP-MOH-01", i64::from(10 - i), 80 + i)).unwrap();
        }
        assert_eq!(store.len().unwrap(), 3);
        let values: Vec<u8> = store.list_anomalies(24, 10).unwrap().iter().map(|r| r.stress_index).collect();
        assert_eq!(values, vec![84, 83, 82]);
    }

    #[test]
    fn test_trait_object() {
        let store: Box<dyn AnomalyStore> = Box::new(MockStore::default());
        assert_eq!(store.backend_name(), "mock");
        assert!(store.is_empty().unwrap());
    }
}
