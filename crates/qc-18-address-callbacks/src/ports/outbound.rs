//! # Outbound Ports (Driven Ports)
//!
//! SPIs required by the Address Callbacks subsystem: key/value persistence,
//! transaction annotation, callback delivery and time.

use crate::domain::{
    AnnotatedTransaction, AnnotationError, CallbackPayload, DeliveryError, KVStoreError,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Key prefix for callback registrations.
pub const CALLBACK_NAMESPACE: &[u8] = b"cb/";

/// Key prefix for seen-transaction records.
pub const SEEN_TX_NAMESPACE: &[u8] = b"seen/";

/// Abstract interface for key/value persistence.
///
/// Only single operations are atomic. Callers that need a read-modify-write
/// sequence to be atomic must serialize it themselves.
pub trait KeyValueStore: Send + Sync {
    /// Get a value by key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError>;

    /// Put a single key-value pair.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError>;

    /// Delete a key. Deleting a missing key is not an error.
    fn delete(&self, key: &[u8]) -> Result<(), KVStoreError>;

    /// All pairs whose key starts with `prefix`.
    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KVStoreError>;
}

/// One namespace inside a shared [`KeyValueStore`].
///
/// Keys passed in and returned are unprefixed.
#[derive(Clone)]
pub struct PrefixedStore {
    inner: Arc<dyn KeyValueStore>,
    prefix: &'static [u8],
}

impl PrefixedStore {
    pub fn new(inner: Arc<dyn KeyValueStore>, prefix: &'static [u8]) -> Self {
        Self { inner, prefix }
    }

    fn make_key(&self, key: &[u8]) -> Vec<u8> {
        let mut full = Vec::with_capacity(self.prefix.len() + key.len());
        full.extend_from_slice(self.prefix);
        full.extend_from_slice(key);
        full
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        self.inner.get(&self.make_key(key))
    }

    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        self.inner.put(&self.make_key(key), value)
    }

    pub fn delete(&self, key: &[u8]) -> Result<(), KVStoreError> {
        self.inner.delete(&self.make_key(key))
    }

    /// Every pair in this namespace.
    pub fn scan(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KVStoreError> {
        let prefix_len = self.prefix.len();
        Ok(self
            .inner
            .prefix_scan(self.prefix)?
            .into_iter()
            .map(|(key, value)| (key[prefix_len..].to_vec(), value))
            .collect())
    }
}

/// Turns a confirmed transaction into address/asset/amount tuples.
pub trait TransactionAnnotator: Send + Sync + 'static {
    /// Transaction type delivered on the listener queue.
    type Transaction: Send + 'static;

    /// Id used for deduplication. Must be cheap; called before `annotate`.
    fn transaction_id(&self, tx: &Self::Transaction) -> Result<String, AnnotationError>;

    /// Annotated inputs and outputs.
    fn annotate(&self, tx: &Self::Transaction) -> Result<AnnotatedTransaction, AnnotationError>;
}

/// Performs one HTTP delivery of a callback payload.
#[async_trait]
pub trait CallbackSender: Send + Sync {
    /// POST `payload` to `url`. Returns the response status.
    ///
    /// Only transport failures are errors; a non-2xx status is still `Ok`.
    async fn send(&self, url: &str, payload: &CallbackPayload) -> Result<u16, DeliveryError>;
}

/// Abstract interface for time operations (for testability).
pub trait TimeSource: Send + Sync {
    /// Get current timestamp in seconds since epoch.
    fn now(&self) -> u64;
}

// =============================================================================
// ADAPTER IMPLEMENTATIONS
// Production: RocksDbStore in adapters/rocksdb_store.rs (feature "rocksdb")
// Testing: In-memory implementations below
// =============================================================================

/// Default time source using system time.
#[derive(Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// In-memory key-value store for unit tests and the `memory` backend.
#[derive(Default)]
pub struct InMemoryKVStore {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl InMemoryKVStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl KeyValueStore for InMemoryKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        Ok(self.data.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        self.data.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), KVStoreError> {
        self.data.write().remove(key);
        Ok(())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KVStoreError> {
        let results = self
            .data
            .read()
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(results)
    }
}

/// Store whose every operation fails with an I/O error.
#[cfg(test)]
pub struct FailingKVStore;

#[cfg(test)]
impl FailingKVStore {
    fn unavailable<T>() -> Result<T, KVStoreError> {
        Err(KVStoreError::IOError {
            message: "disk unavailable".to_string(),
        })
    }
}

#[cfg(test)]
impl KeyValueStore for FailingKVStore {
    fn get(&self, _key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        Self::unavailable()
    }

    fn put(&self, _key: &[u8], _value: &[u8]) -> Result<(), KVStoreError> {
        Self::unavailable()
    }

    fn delete(&self, _key: &[u8]) -> Result<(), KVStoreError> {
        Self::unavailable()
    }

    fn prefix_scan(&self, _prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KVStoreError> {
        Self::unavailable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaces_do_not_collide() {
        let shared: Arc<dyn KeyValueStore> = Arc::new(InMemoryKVStore::new());
        let callbacks = PrefixedStore::new(Arc::clone(&shared), CALLBACK_NAMESPACE);
        let seen = PrefixedStore::new(Arc::clone(&shared), SEEN_TX_NAMESPACE);

        callbacks.put(b"key", b"callbacks").unwrap();
        seen.put(b"key", b"seen").unwrap();

        assert_eq!(callbacks.get(b"key").unwrap().unwrap(), b"callbacks");
        assert_eq!(seen.get(b"key").unwrap().unwrap(), b"seen");

        let scanned = seen.scan().unwrap();
        assert_eq!(scanned, vec![(b"key".to_vec(), b"seen".to_vec())]);
    }

    #[test]
    fn test_delete_missing_key_is_ok() {
        let store = InMemoryKVStore::new();
        assert!(store.delete(b"missing").is_ok());
        assert!(store.is_empty());
    }

    #[test]
    fn test_prefix_scan_stops_at_prefix_boundary() {
        let store = InMemoryKVStore::new();
        store.put(b"cb/a", b"1").unwrap();
        store.put(b"cb/b", b"2").unwrap();
        store.put(b"cc/a", b"3").unwrap();

        let results = store.prefix_scan(b"cb/").unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_prefixed_store_propagates_backend_errors() {
        let store = PrefixedStore::new(Arc::new(FailingKVStore), SEEN_TX_NAMESPACE);
        assert!(matches!(store.get(b"key"), Err(KVStoreError::IOError { .. })));
        assert!(matches!(store.scan(), Err(KVStoreError::IOError { .. })));
    }
}
