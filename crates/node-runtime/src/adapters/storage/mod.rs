//! # Storage Wiring
//!
//! Opens the [`KeyValueStore`] selected by [`StorageConfig`].
//!
//! Enable the `rocksdb` feature for the persistent backend:
//!
//! ```toml
//! node-runtime = { path = "...", features = ["rocksdb"] }
//! ```

use std::sync::Arc;

use anyhow::Result;
use qc_18_address_callbacks::{InMemoryKVStore, KeyValueStore};
use tracing::warn;

use crate::container::config::{StorageBackend, StorageConfig};

/// Open the configured backend.
pub fn open_store(config: &StorageConfig) -> Result<Arc<dyn KeyValueStore>> {
    match config.backend {
        StorageBackend::Memory => {
            warn!("Using in-memory storage; registrations are lost on restart");
            Ok(Arc::new(InMemoryKVStore::new()))
        }
        StorageBackend::Rocksdb => open_rocksdb(config),
    }
}

#[cfg(feature = "rocksdb")]
fn open_rocksdb(config: &StorageConfig) -> Result<Arc<dyn KeyValueStore>> {
    use anyhow::Context;
    use qc_18_address_callbacks::{RocksDbConfig, RocksDbStore};
    use tracing::info;

    std::fs::create_dir_all(&config.data_dir).with_context(|| {
        format!("Failed to create data dir {}", config.data_dir.display())
    })?;
    let store = RocksDbStore::open(RocksDbConfig {
        path: config.data_dir.clone(),
        ..Default::default()
    })
    .map_err(|e| anyhow::anyhow!("{}", e))?;

    info!(path = %config.data_dir.display(), "Opened RocksDB storage");
    Ok(Arc::new(store))
}

#[cfg(not(feature = "rocksdb"))]
fn open_rocksdb(_config: &StorageConfig) -> Result<Arc<dyn KeyValueStore>> {
    anyhow::bail!("storage backend 'rocksdb' requires building with the `rocksdb` feature")
}
