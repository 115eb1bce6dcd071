//! # RocksDB Storage Adapter
//!
//! Persistent [`KeyValueStore`] for the callback registry and dedup records.
//!
//! Both namespaces (`cb/`, `seen/`) live in the default column family, so a
//! single database holds the whole subsystem. Prefix scans rely on the
//! bytewise key order.

use crate::domain::KVStoreError;
use crate::ports::KeyValueStore;
use rocksdb::{Direction, IteratorMode, Options, WriteOptions, DB};
use std::path::PathBuf;

/// RocksDB configuration
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    /// Path to the database directory
    pub path: PathBuf,
    /// Block cache size in bytes (default: 64MB)
    pub block_cache_size: usize,
    /// Write buffer size in bytes (default: 16MB)
    pub write_buffer_size: usize,
    /// Enable fsync after each write (default: true)
    pub sync_writes: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/callbacks"),
            block_cache_size: 64 * 1024 * 1024,
            write_buffer_size: 16 * 1024 * 1024,
            sync_writes: true,
        }
    }
}

impl RocksDbConfig {
    /// Small buffers and no fsync, for tests.
    pub fn for_testing(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            block_cache_size: 8 * 1024 * 1024,
            write_buffer_size: 4 * 1024 * 1024,
            sync_writes: false,
        }
    }
}

/// RocksDB-backed key-value store.
pub struct RocksDbStore {
    db: DB,
    sync_writes: bool,
}

impl RocksDbStore {
    /// Open or create the database described by `config`.
    pub fn open(config: RocksDbConfig) -> Result<Self, KVStoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        block_opts.set_block_cache(&rocksdb::Cache::new_lru_cache(config.block_cache_size));
        opts.set_block_based_table_factory(&block_opts);

        let db = DB::open(&opts, &config.path).map_err(|e| KVStoreError::IOError {
            message: format!("Failed to open RocksDB at {}: {}", config.path.display(), e),
        })?;

        Ok(Self {
            db,
            sync_writes: config.sync_writes,
        })
    }

    fn write_opts(&self) -> WriteOptions {
        let mut opts = WriteOptions::default();
        opts.set_sync(self.sync_writes);
        opts
    }
}

impl KeyValueStore for RocksDbStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        self.db.get(key).map_err(|e| KVStoreError::IOError {
            message: format!("RocksDB get failed: {}", e),
        })
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        self.db
            .put_opt(key, value, &self.write_opts())
            .map_err(|e| KVStoreError::IOError {
                message: format!("RocksDB put failed: {}", e),
            })
    }

    fn delete(&self, key: &[u8]) -> Result<(), KVStoreError> {
        self.db
            .delete_opt(key, &self.write_opts())
            .map_err(|e| KVStoreError::IOError {
                message: format!("RocksDB delete failed: {}", e),
            })
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KVStoreError> {
        let mut results = Vec::new();

        for item in self.db.iterator(IteratorMode::From(prefix, Direction::Forward)) {
            let (key, value) = item.map_err(|e| KVStoreError::IOError {
                message: format!("RocksDB scan failed: {}", e),
            })?;
            if !key.starts_with(prefix) {
                break;
            }
            results.push((key.to_vec(), value.to_vec()));
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::CallbackRegistryApi;
    use crate::service::CallbackStore;
    use std::sync::Arc;
    use tempfile::TempDir;

    const ADDRESS: &str = "sample address should be of length more than 42 - 1";

    #[test]
    fn test_basic_operations() {
        let dir = TempDir::new().unwrap();
        let store = RocksDbStore::open(RocksDbConfig::for_testing(dir.path())).unwrap();

        store.put(b"key1", b"value1").unwrap();
        assert_eq!(store.get(b"key1").unwrap(), Some(b"value1".to_vec()));

        store.delete(b"key1").unwrap();
        assert_eq!(store.get(b"key1").unwrap(), None);
        store.delete(b"key1").unwrap();
    }

    #[test]
    fn test_prefix_scan() {
        let dir = TempDir::new().unwrap();
        let store = RocksDbStore::open(RocksDbConfig::for_testing(dir.path())).unwrap();

        store.put(b"cb/a", b"1").unwrap();
        store.put(b"cb/b", b"2").unwrap();
        store.put(b"seen/a", b"3").unwrap();

        let results = store.prefix_scan(b"cb/").unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0], (b"cb/a".to_vec(), b"1".to_vec()));
    }

    #[test]
    fn test_registrations_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let kv = Arc::new(RocksDbStore::open(RocksDbConfig::for_testing(dir.path())).unwrap());
            let store = CallbackStore::new(kv);
            store.add(ADDRESS, "https://example.com/1").unwrap();
            store.add(ADDRESS, "https://example.com/2").unwrap();
        }

        let kv = Arc::new(RocksDbStore::open(RocksDbConfig::for_testing(dir.path())).unwrap());
        let store = CallbackStore::new(kv);
        assert_eq!(
            store.list(ADDRESS).unwrap(),
            ["https://example.com/1", "https://example.com/2"]
        );
    }
}
