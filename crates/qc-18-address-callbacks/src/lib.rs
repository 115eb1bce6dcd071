//! # Address Callbacks (qc-18)
//!
//! Webhook notifications for payments to watched addresses. Clients register
//! callback URLs against an address; whenever a newly confirmed transaction
//! pays that address, every registered URL receives a JSON POST.
//!
//! ## Architecture
//!
//! ```text
//! Registration (HTTP/CLI) ──→ CallbackStore ──→ KeyValueStore["cb/…"]
//!                                   ↑ list()
//! Confirmed tx ──→ [queue] ──→ TxListener ──→ SeenTransactionStore ──→ KeyValueStore["seen/…"]
//!                                   │                  ↑ purge
//!                                   │               Reaper (hourly, TTL 48h)
//!                                   ↓
//!                              Dispatcher ──→ HTTP POST per URL
//! ```
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | Ordered URL set | Registration order preserved, no duplicates |
//! | 2 | No empty registrations | Removing the last URL deletes the key |
//! | 3 | Address length | Addresses shorter than 42 chars are rejected |
//! | 4 | One pass per tx | A transaction id is processed at most once while its record lives |
//! | 5 | No self-notification | Outputs paying an input address are not notified |
//! | 6 | Non-blocking dispatch | Delivery never stalls the listener |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - URL validation, payloads, config, errors
//! - `ports/` - Port traits (inbound registry API, outbound SPIs)
//! - `service/` - Stores, listener, reaper, dispatcher
//! - `adapters/` - reqwest sender, pass-through annotator, RocksDB store
//!
//! ## Usage
//!
//! ```ignore
//! use qc_18_address_callbacks::*;
//!
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! let dispatch = DispatchConfig::default();
//! let service = AddressCallbackService::start(
//!     Arc::new(InMemoryKVStore::new()),
//!     PassthroughAnnotator,
//!     Arc::new(HttpCallbackSender::new(&dispatch)?),
//!     &ListenerConfig::default(),
//!     dispatch,
//!     Arc::new(SystemTimeSource),
//!     shutdown_rx,
//! );
//!
//! service.registry().add(address, "https://merchant.example/hook")?;
//! service.listener().submit(tx).await?;
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// Re-export key types for convenience
pub use adapters::{HttpCallbackSender, PassthroughAnnotator, PreAnnotatedTransaction};
#[cfg(feature = "rocksdb")]
pub use adapters::{RocksDbConfig, RocksDbStore};
pub use domain::{
    is_url, AnnotatedInput, AnnotatedOutput, AnnotatedTransaction, AnnotationError,
    CallbackError, CallbackPayload, DeliveryError, DeliveryOutcome, DeliveryRecord,
    DispatchConfig, KVStoreError, ListenerConfig, ListenerError, ProcessOutcome, ReapStats,
    SeenStoreError, SeenTxRecord,
};
pub use ports::{
    CallbackRegistryApi, CallbackSender, InMemoryKVStore, KeyValueStore, SystemTimeSource,
    TimeSource, TransactionAnnotator,
};
pub use service::{
    AddressCallbackService, CallbackStore, DeliveryLog, Dispatcher, DispatcherHandle, Reaper,
    SeenTransactionStore, TxListener, TxListenerHandle,
};
