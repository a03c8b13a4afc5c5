//! Sled-backed anomaly store
//!
//! Key: timestamp millis as u64 big-endian bytes followed by the record id,
//! so iteration order is chronological and same-millisecond records do not
//! collide. Value: JSON-serialized [`AnomalyRecord`].

use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;

use super::{AnomalyStore, StoreError};
use crate::types::AnomalyRecord;

#[derive(Clone)]
pub struct SledStore {
    db: Arc<sled::Db>,
}

impl SledStore {
    /// Open or create the store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path_ref = path.as_ref();
        let db = sled::open(path_ref)?;
        tracing::info!("Anomaly store opened at {:?}", path_ref);
        Ok(Self { db: Arc::new(db) })
    }

    /// Delete records older than `cutoff`. Returns the number removed.
    pub fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let cutoff_key = millis_key(cutoff);
        let keys: Vec<_> = self
            .db
            .range(..cutoff_key.as_slice())
            .keys()
            .collect::<Result<_, _>>()?;

        for key in &keys {
            self.db.remove(key)?;
        }
        if !keys.is_empty() {
            self.db.flush()?;
        }
        Ok(keys.len())
    }

    pub fn size_bytes(&self) -> u64 {
        self.db.size_on_disk().unwrap_or(0)
    }
}

fn millis_key(timestamp: DateTime<Utc>) -> [u8; 8] {
    // Pre-epoch timestamps sort first.
    let millis = u64::try_from(timestamp.timestamp_millis()).unwrap_or(0);
    millis.to_be_bytes()
}

fn record_key(record: &AnomalyRecord) -> Vec<u8> {
    let mut key = millis_key(record.timestamp).to_vec();
    key.extend_from_slice(record.id.as_bytes());
    key
}

impl AnomalyStore for SledStore {
    fn record(&self, anomaly: &AnomalyRecord) -> Result<(), StoreError> {
        let value = serde_json::to_vec(anomaly)?;
        self.db.insert(record_key(anomaly), value)?;
        Ok(())
    }

    fn list_since(
        &self,
        cutoff: DateTime<Utc>,
        node_id: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<AnomalyRecord>, StoreError> {
        let limit = limit.unwrap_or(usize::MAX);
        let mut records = Vec::new();

        for item in self.db.range(millis_key(cutoff).as_slice()..).rev() {
            if records.len() >= limit {
                break;
            }
            let (_key, value) = item?;
            let record: AnomalyRecord = match serde_json::from_slice(&value) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping undecodable anomaly record");
                    continue;
                }
            };
            if node_id.map_or(true, |id| record.node_id == id) {
                records.push(record);
            }
        }

        Ok(records)
    }

    fn len(&self) -> Result<usize, StoreError> {
        Ok(self.db.len())
    }

    fn backend_name(&self) -> &'static str {
        "sled"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::record;
    use chrono::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_store_and_list() {
        let dir = TempDir::new().unwrap();
        let store = SledStore::open(dir.path()).unwrap();

        store.record(&record("CP-MOH-01", 40, 81)).unwrap();
        store.record(&record("CP-MOH-03", 20, 86)).unwrap();
        store.record(&record("CP-MOH-01", 5, 90)).unwrap();

        let list = store.list_anomalies(24, 50).unwrap();
        let values: Vec<u8> = list.iter().map(|r| r.stress_index).collect();
        assert_eq!(values, vec![90, 86, 81]);

        let node = store.list_anomalies_for_node("CP-MOH-01", 24).unwrap();
        assert_eq!(node.len(), 2);
        assert!(node.iter().all(|r| r.node_id == "CP-MOH-01"));
    }

    #[test]
    fn test_reopen_persists() {
        let dir = TempDir::new().unwrap();
        let original = record("CP-MOH-02", 1, 88);
        {
            let store = SledStore::open(dir.path()).unwrap();
            store.record(&original).unwrap();
        }
        let store = SledStore::open(dir.path()).unwrap();
        let list = store.list_anomalies(1, 10).unwrap();
        assert_eq!(list, vec![original]);
    }

    #[test]
    fn test_same_millisecond_records_kept() {
        let dir = TempDir::new().unwrap();
        let store = SledStore::open(dir.path()).unwrap();
        let a = record("CP-MOH-01", 1, 81);
        let mut b = record("CP-MOH-02", 1, 82);
        b.timestamp = a.timestamp;
        store.record(&a).unwrap();
        store.record(&b).unwrap();
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn test_prune_before() {
        let dir = TempDir::new().unwrap();
        let store = SledStore::open(dir.path()).unwrap();
        store.record(&record("CP-MOH-01", 60 * 48, 81)).unwrap();
        store.record(&record("CP-MOH-01", 10, 82)).unwrap();

        let removed = store.prune_before(Utc::now() - Duration::hours(24)).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.len().unwrap(), 1);
    }
}
