//! # Transaction Listener
//!
//! Single consumer of the inbound transaction queue.
//!
//! ```text
//! producer ──submit()──→ [bounded queue] ──→ TxListener::run
//!                                                 │
//!                                    seen before? ├── yes → discard
//!                                                 │
//!                                   record seen → annotate → for each output:
//!                                                 │    callbacks registered AND
//!                                                 │    address not among inputs?
//!                                                 ↓
//!                                       DispatcherHandle::dispatch (per URL)
//! ```
//!
//! Transactions are considered in arrival order. Dispatch never blocks the
//! loop, and no per-transaction failure stops it.

use crate::domain::{CallbackError, CallbackPayload, ListenerError, ProcessOutcome};
use crate::ports::{CallbackRegistryApi, TimeSource, TransactionAnnotator};
use crate::service::{CallbackStore, DispatcherHandle, SeenTransactionStore};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Producer side of the listener queue.
pub struct TxListenerHandle<T> {
    queue: mpsc::Sender<T>,
}

impl<T> Clone for TxListenerHandle<T> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
        }
    }
}

impl<T: Send + 'static> TxListenerHandle<T> {
    /// Enqueue a confirmed transaction, waiting while the queue is full.
    pub async fn submit(&self, tx: T) -> Result<(), ListenerError> {
        self.queue
            .send(tx)
            .await
            .map_err(|_| ListenerError::ListenerClosed)
    }

    /// Enqueue without waiting. A full queue drops the transaction.
    pub fn try_submit(&self, tx: T) -> Result<(), ListenerError> {
        match self.queue.try_send(tx) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                warn!("[qc-18] Transaction queue full, dropping transaction");
                Err(ListenerError::QueueFull)
            }
            Err(TrySendError::Closed(_)) => Err(ListenerError::ListenerClosed),
        }
    }

    /// Transactions waiting to be processed.
    pub fn pending(&self) -> usize {
        self.queue.max_capacity() - self.queue.capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }
}

/// Dedups incoming transactions and fans out callbacks for paid addresses.
pub struct TxListener<A: TransactionAnnotator> {
    callbacks: Arc<CallbackStore>,
    seen: Arc<SeenTransactionStore>,
    annotator: A,
    dispatcher: DispatcherHandle,
    time: Arc<dyn TimeSource>,
}

impl<A: TransactionAnnotator> TxListener<A> {
    pub fn new(
        callbacks: Arc<CallbackStore>,
        seen: Arc<SeenTransactionStore>,
        annotator: A,
        dispatcher: DispatcherHandle,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            callbacks,
            seen,
            annotator,
            dispatcher,
            time,
        }
    }

    /// Start the consumer loop with a queue of `capacity` transactions.
    pub fn spawn(
        self,
        capacity: usize,
        shutdown: watch::Receiver<bool>,
    ) -> (TxListenerHandle<A::Transaction>, JoinHandle<()>) {
        let (queue, rx) = mpsc::channel(capacity.max(1));
        let task = tokio::spawn(self.run(rx, shutdown));
        (TxListenerHandle { queue }, task)
    }

    async fn run(self, mut rx: mpsc::Receiver<A::Transaction>, mut shutdown: watch::Receiver<bool>) {
        info!("[qc-18] Transaction listener started");
        loop {
            tokio::select! {
                next = rx.recv() => match next {
                    Some(tx) => {
                        self.process_transaction(&tx);
                    }
                    None => {
                        debug!("[qc-18] Transaction queue closed");
                        break;
                    }
                },
                _ = shutdown.changed() => {
                    info!("[qc-18] Transaction listener received shutdown signal");
                    break;
                }
            }
        }
        info!("[qc-18] Transaction listener stopped");
    }

    /// Handle one transaction end to end.
    pub fn process_transaction(&self, tx: &A::Transaction) -> ProcessOutcome {
        let tx_id = match self.annotator.transaction_id(tx) {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "[qc-18] Skipping transaction without usable id");
                return ProcessOutcome::Skipped;
            }
        };

        match self.seen.contains(&tx_id) {
            Ok(true) => {
                debug!(tx_id = %tx_id, "[qc-18] Transaction already processed");
                return ProcessOutcome::Duplicate;
            }
            Ok(false) => {}
            Err(e) => {
                warn!(tx_id = %tx_id, error = %e, "[qc-18] Dedup lookup failed, processing anyway");
            }
        }
        if let Err(e) = self.seen.record(&tx_id, self.time.now()) {
            warn!(tx_id = %tx_id, error = %e, "[qc-18] Failed to record seen transaction");
        }

        info!(tx_id = %tx_id, "[qc-18] Processing a new transaction");

        let annotated = match self.annotator.annotate(tx) {
            Ok(annotated) => annotated,
            Err(e) => {
                warn!(tx_id = %tx_id, error = %e, "[qc-18] Skipping transaction with malformed annotation");
                return ProcessOutcome::Skipped;
            }
        };

        for input in &annotated.inputs {
            debug!(address = %input.address, asset_id = %input.asset_id, amount = input.amount, "[qc-18] Input");
        }

        let mut dispatched = 0;
        for output in &annotated.outputs {
            debug!(address = %output.address, asset_id = %output.asset_id, amount = output.amount, "[qc-18] Output");

            let urls = match self.callbacks.list(&output.address) {
                Ok(urls) => urls,
                Err(CallbackError::BadAddress) => continue,
                Err(e) => {
                    warn!(address = %output.address, error = %e, "[qc-18] Callback lookup failed");
                    continue;
                }
            };
            if urls.is_empty() {
                continue;
            }
            if annotated.has_input_from(&output.address) {
                debug!(address = %output.address, "[qc-18] Output returns to an input address, not notifying");
                continue;
            }

            let payload = CallbackPayload::for_output(output, &tx_id);
            for url in &urls {
                if self.dispatcher.dispatch(url, payload.clone()) {
                    dispatched += 1;
                }
            }
        }

        if dispatched > 0 {
            info!(tx_id = %tx_id, dispatched, "[qc-18] Callbacks queued");
        }
        ProcessOutcome::Processed { dispatched }
    }
}
