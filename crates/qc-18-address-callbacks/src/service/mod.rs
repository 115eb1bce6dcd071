//! # Address Callbacks Service
//!
//! Application services and the wiring that starts them.
//!
//! ## Components
//!
//! | Component | Role |
//! |-----------|------|
//! | `CallbackStore` | Registry of callback URLs per address |
//! | `SeenTransactionStore` | Dedup records with first-seen time |
//! | `TxListener` | Single consumer of confirmed transactions |
//! | `Dispatcher` | Bounded, retrying callback delivery |
//! | `Reaper` | Hourly purge of expired dedup records |
//!
//! Both stores share one [`KeyValueStore`] under separate key prefixes.

mod callback_store;
mod dispatcher;
mod listener;
mod reaper;
mod seen_store;

pub use callback_store::CallbackStore;
pub use dispatcher::{DeliveryLog, Dispatcher, DispatcherHandle};
pub use listener::{TxListener, TxListenerHandle};
pub use reaper::Reaper;
pub use seen_store::SeenTransactionStore;

use crate::domain::{DispatchConfig, ListenerConfig};
use crate::ports::{CallbackSender, KeyValueStore, TimeSource, TransactionAnnotator};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// A running Address Callbacks subsystem.
pub struct AddressCallbackService<T> {
    callbacks: Arc<CallbackStore>,
    seen: Arc<SeenTransactionStore>,
    listener: TxListenerHandle<T>,
    dispatcher: DispatcherHandle,
    tasks: Vec<JoinHandle<()>>,
}

impl<T: Send + 'static> AddressCallbackService<T> {
    /// Start the dispatcher, listener and reaper.
    ///
    /// All three stop when `shutdown` changes.
    pub fn start<A>(
        kv: Arc<dyn KeyValueStore>,
        annotator: A,
        sender: Arc<dyn CallbackSender>,
        listener_config: &ListenerConfig,
        dispatch_config: DispatchConfig,
        time: Arc<dyn TimeSource>,
        shutdown: watch::Receiver<bool>,
    ) -> Self
    where
        A: TransactionAnnotator<Transaction = T>,
    {
        let callbacks = Arc::new(CallbackStore::new(Arc::clone(&kv)));
        let seen = Arc::new(SeenTransactionStore::new(kv));

        let dispatcher = Dispatcher::spawn(
            sender,
            dispatch_config,
            Arc::clone(&time),
            shutdown.clone(),
        );

        let listener = TxListener::new(
            Arc::clone(&callbacks),
            Arc::clone(&seen),
            annotator,
            dispatcher.clone(),
            Arc::clone(&time),
        );
        let (listener, listener_task) =
            listener.spawn(listener_config.queue_capacity, shutdown.clone());

        let reaper_task =
            Reaper::new(Arc::clone(&seen), time, listener_config).spawn(shutdown);

        info!("[qc-18] Address callbacks subsystem started");

        Self {
            callbacks,
            seen,
            listener,
            dispatcher,
            tasks: vec![listener_task, reaper_task],
        }
    }

    /// Registration API.
    pub fn registry(&self) -> Arc<CallbackStore> {
        Arc::clone(&self.callbacks)
    }

    pub fn seen_transactions(&self) -> Arc<SeenTransactionStore> {
        Arc::clone(&self.seen)
    }

    /// Producer handle for confirmed transactions.
    pub fn listener(&self) -> TxListenerHandle<T> {
        self.listener.clone()
    }

    pub fn delivery_log(&self) -> Arc<DeliveryLog> {
        self.dispatcher.delivery_log()
    }

    /// Wait for the listener and reaper to exit.
    pub async fn join(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "[qc-18] Subsystem task ended abnormally");
            }
        }
        info!("[qc-18] Address callbacks subsystem stopped");
    }
}
