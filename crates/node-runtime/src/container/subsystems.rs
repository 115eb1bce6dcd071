//! # Subsystem Container
//!
//! Holds the running address callbacks subsystem and its backends.
//!
//! ## Initialization Order
//!
//! ```text
//! 1. Key/value store (memory or RocksDB)
//! 2. HTTP callback sender
//! 3. AddressCallbackService (dispatcher → listener → reaper)
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::{info, warn};

use qc_18_address_callbacks::{
    AddressCallbackService, CallbackStore, DeliveryLog, HttpCallbackSender, PassthroughAnnotator,
    PreAnnotatedTransaction, SystemTimeSource, TxListenerHandle,
};

use crate::adapters::open_store;
use crate::container::config::NodeConfig;

/// Address callbacks service fed with pre-annotated transactions.
pub type CallbackService = AddressCallbackService<PreAnnotatedTransaction>;

/// Central container holding all subsystem instances.
pub struct SubsystemContainer {
    /// Node configuration.
    pub config: NodeConfig,
    /// Address Callbacks (Subsystem 18)
    pub callbacks: CallbackService,
}

impl SubsystemContainer {
    /// Open storage and start every background task.
    ///
    /// Tasks stop when `shutdown` changes.
    pub fn new(config: NodeConfig, shutdown: watch::Receiver<bool>) -> Result<Self> {
        info!("Initializing subsystems...");

        let store = open_store(&config.storage).context("Failed to open storage")?;

        let sender = HttpCallbackSender::new(&config.dispatch)
            .context("Failed to create callback HTTP client")?;
        if config.dispatch.accept_invalid_certs {
            warn!("[qc-18] TLS certificate verification is DISABLED for callbacks");
        }

        let callbacks = AddressCallbackService::start(
            store,
            PassthroughAnnotator,
            Arc::new(sender),
            &config.listener,
            config.dispatch.clone(),
            Arc::new(SystemTimeSource),
            shutdown,
        );
        info!("  [18] Address Callbacks initialized");

        Ok(Self { config, callbacks })
    }

    pub fn registry(&self) -> Arc<CallbackStore> {
        self.callbacks.registry()
    }

    pub fn listener(&self) -> TxListenerHandle<PreAnnotatedTransaction> {
        self.callbacks.listener()
    }

    pub fn delivery_log(&self) -> Arc<DeliveryLog> {
        self.callbacks.delivery_log()
    }
}
