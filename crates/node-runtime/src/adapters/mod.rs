//! # Adapter Implementations
//!
//! Concrete backends wired into the address callbacks subsystem.
//!
//! ```text
//! NodeConfig.storage ──→ storage::open_store ──→ Arc<dyn KeyValueStore>
//!                                                   ├─ InMemoryKVStore
//!                                                   └─ RocksDbStore (feature "rocksdb")
//! ```

pub mod storage;

pub use storage::open_store;
