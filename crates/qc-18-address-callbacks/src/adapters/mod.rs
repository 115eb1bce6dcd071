//! # Adapters
//!
//! - `http_sender` - reqwest [`CallbackSender`](crate::ports::CallbackSender)
//! - `annotator` - pass-through annotator for pre-annotated transactions
//! - `rocksdb_store` - RocksDB [`KeyValueStore`](crate::ports::KeyValueStore) (feature `rocksdb`)

pub mod annotator;
pub mod http_sender;
#[cfg(feature = "rocksdb")]
pub mod rocksdb_store;

pub use annotator::{PassthroughAnnotator, PreAnnotatedTransaction};
pub use http_sender::HttpCallbackSender;
#[cfg(feature = "rocksdb")]
pub use rocksdb_store::{RocksDbConfig, RocksDbStore};
