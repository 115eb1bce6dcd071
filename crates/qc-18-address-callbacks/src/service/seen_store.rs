//! # Seen Transaction Store
//!
//! Dedup records: transaction id → first-seen Unix timestamp. Records are
//! written once and only removed by the reaper.

use crate::domain::{ReapStats, SeenStoreError, SeenTxRecord};
use crate::ports::{KeyValueStore, PrefixedStore, SEEN_TX_NAMESPACE};
use std::sync::Arc;
use tracing::debug;

/// Dedup store backed by a [`KeyValueStore`] namespace.
pub struct SeenTransactionStore {
    db: PrefixedStore,
}

impl SeenTransactionStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            db: PrefixedStore::new(kv, SEEN_TX_NAMESPACE),
        }
    }

    /// Whether `tx_id` has a record.
    pub fn contains(&self, tx_id: &str) -> Result<bool, SeenStoreError> {
        Ok(self.db.get(tx_id.as_bytes())?.is_some())
    }

    /// Record `tx_id` as first seen at `now`.
    pub fn record(&self, tx_id: &str, now: u64) -> Result<(), SeenStoreError> {
        let value = serde_json::to_vec(&SeenTxRecord { unixtime: now })?;
        self.db.put(tx_id.as_bytes(), &value)?;
        Ok(())
    }

    /// Stored record for `tx_id`, if any.
    pub fn get(&self, tx_id: &str) -> Result<Option<SeenTxRecord>, SeenStoreError> {
        match self.db.get(tx_id.as_bytes())? {
            Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            None => Ok(None),
        }
    }

    /// Remove records older than `ttl_secs` at `now`.
    ///
    /// Records that no longer deserialize carry no usable timestamp and
    /// would never expire, so they are removed as well.
    pub fn purge_expired(&self, now: u64, ttl_secs: u64) -> Result<ReapStats, SeenStoreError> {
        let mut stats = ReapStats::default();

        for (key, value) in self.db.scan()? {
            stats.scanned += 1;
            match serde_json::from_slice::<SeenTxRecord>(&value) {
                Ok(record) if record.is_expired(now, ttl_secs) => {
                    self.db.delete(&key)?;
                    stats.expired += 1;
                }
                Ok(_) => {}
                Err(e) => {
                    debug!(
                        tx_id = %String::from_utf8_lossy(&key),
                        error = %e,
                        "[qc-18] Purging unreadable seen-transaction record"
                    );
                    self.db.delete(&key)?;
                    stats.corrupt += 1;
                }
            }
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::InMemoryKVStore;

    const TTL: u64 = 48 * 60 * 60;

    #[test]
    fn test_record_round_trip() {
        let store = SeenTransactionStore::new(Arc::new(InMemoryKVStore::new()));
        assert!(!store.contains("txid").unwrap());

        store.record("txid", 1_700_000_000).unwrap();

        assert!(store.contains("txid").unwrap());
        assert_eq!(
            store.get("txid").unwrap(),
            Some(SeenTxRecord {
                unixtime: 1_700_000_000
            })
        );
    }

    #[test]
    fn test_purge_removes_only_expired() {
        let store = SeenTransactionStore::new(Arc::new(InMemoryKVStore::new()));
        let now = 1_700_000_000;
        store.record("old", now - TTL - 1).unwrap();
        store.record("boundary", now - TTL).unwrap();
        store.record("fresh", now - 60).unwrap();

        let stats = store.purge_expired(now, TTL).unwrap();

        assert_eq!(stats.scanned, 3);
        assert_eq!(stats.expired, 1);
        assert!(!store.contains("old").unwrap());
        assert!(store.contains("boundary").unwrap());
        assert!(store.contains("fresh").unwrap());
    }

    /// A record that cannot be decoded is purged instead of living forever.
    #[test]
    fn test_purge_removes_corrupt_records() {
        let kv = Arc::new(InMemoryKVStore::new());
        let store = SeenTransactionStore::new(kv.clone());
        store.record("good", 1_700_000_000).unwrap();

        let mut key = SEEN_TX_NAMESPACE.to_vec();
        key.extend_from_slice(b"broken");
        kv.put(&key, b"{not json").unwrap();

        let stats = store.purge_expired(1_700_000_000, TTL).unwrap();

        assert_eq!(stats.corrupt, 1);
        assert_eq!(stats.purged(), 1);
        assert!(!store.contains("broken").unwrap());
        assert!(store.contains("good").unwrap());
    }
}
