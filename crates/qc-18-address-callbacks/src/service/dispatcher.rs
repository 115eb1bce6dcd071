//! # Callback Dispatcher
//!
//! Delivers callback payloads without ever blocking the listener.
//!
//! ```text
//! TxListener ──dispatch()──→ [bounded job queue] ──→ run_workers
//!      │                        (full → Dropped)        ├─ acquire semaphore permit
//!      │                                                ├─ spawn deliver()
//!      │                                                │    ├─ sender.send()
//!      │                                                │    └─ retry with backoff
//!      │                                                └─ DeliveryLog.push(outcome)
//! ```
//!
//! Concurrency is capped by `max_concurrent`; pending work by
//! `queue_capacity`. Only transport errors count as failures. Delivery is
//! best-effort: an abandoned or dropped job is logged and recorded, never
//! retried later.

use crate::domain::{CallbackPayload, DeliveryOutcome, DeliveryRecord, DispatchConfig};
use crate::ports::{CallbackSender, TimeSource};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch, Semaphore};
use tracing::{debug, info, warn};

/// Drop reason for jobs that the stopped worker loop will never run.
const DISPATCHER_STOPPED: &str = "dispatcher stopped";

/// One (URL, payload) delivery.
#[derive(Debug)]
struct DispatchJob {
    url: String,
    payload: CallbackPayload,
}

/// Bounded in-memory log of delivery outcomes. Oldest entries are evicted.
pub struct DeliveryLog {
    records: Mutex<VecDeque<DeliveryRecord>>,
    capacity: usize,
}

impl DeliveryLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity.min(1_024))),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&self, record: DeliveryRecord) {
        let mut records = self.records.lock();
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }

    /// All retained records, oldest first.
    pub fn recent(&self) -> Vec<DeliveryRecord> {
        self.records.lock().iter().cloned().collect()
    }

    /// Retained records whose payload never reached the endpoint.
    pub fn dead_letters(&self) -> Vec<DeliveryRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.outcome.is_dead_letter())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

/// Cheap, cloneable entry point used by the listener.
#[derive(Clone)]
pub struct DispatcherHandle {
    jobs: mpsc::Sender<DispatchJob>,
    log: Arc<DeliveryLog>,
    time: Arc<dyn TimeSource>,
}

impl DispatcherHandle {
    /// Queue a delivery. Never blocks.
    ///
    /// Returns `false` if the job was dropped because the queue is full or
    /// the dispatcher has stopped; the drop is recorded in the delivery log.
    pub fn dispatch(&self, url: &str, payload: CallbackPayload) -> bool {
        let job = DispatchJob {
            url: url.to_string(),
            payload,
        };

        let (job, reason) = match self.jobs.try_send(job) {
            Ok(()) => return true,
            Err(TrySendError::Full(job)) => (job, "dispatch queue full"),
            Err(TrySendError::Closed(job)) => (job, DISPATCHER_STOPPED),
        };
        record_dropped(&self.log, job, reason, self.time.now());
        false
    }

    pub fn delivery_log(&self) -> Arc<DeliveryLog> {
        Arc::clone(&self.log)
    }
}

/// Spawns the dispatch worker loop.
pub struct Dispatcher;

impl Dispatcher {
    /// Start the worker loop and return a handle for queuing deliveries.
    ///
    /// The loop stops when `shutdown` changes or every handle is dropped.
    /// Deliveries already in flight run to completion; queued ones are
    /// recorded as dropped.
    pub fn spawn(
        sender: Arc<dyn CallbackSender>,
        config: DispatchConfig,
        time: Arc<dyn TimeSource>,
        shutdown: watch::Receiver<bool>,
    ) -> DispatcherHandle {
        let (jobs, rx) = mpsc::channel(config.queue_capacity.max(1));
        let log = Arc::new(DeliveryLog::new(config.delivery_log_capacity));

        tokio::spawn(run_workers(
            rx,
            sender,
            Arc::new(config),
            Arc::clone(&log),
            Arc::clone(&time),
            shutdown,
        ));

        DispatcherHandle { jobs, log, time }
    }
}

async fn run_workers(
    mut rx: mpsc::Receiver<DispatchJob>,
    sender: Arc<dyn CallbackSender>,
    config: Arc<DispatchConfig>,
    log: Arc<DeliveryLog>,
    time: Arc<dyn TimeSource>,
    mut shutdown: watch::Receiver<bool>,
) {
    let semaphore = Arc::new(Semaphore::new(config.max_concurrent.max(1)));

    let stranded = loop {
        let job = tokio::select! {
            biased;
            _ = shutdown.changed() => {
                info!("[qc-18] Dispatcher received shutdown signal");
                break None;
            }
            job = rx.recv() => match job {
                Some(job) => job,
                None => {
                    debug!("[qc-18] Dispatch queue closed");
                    break None;
                }
            },
        };

        let permit = tokio::select! {
            biased;
            _ = shutdown.changed() => {
                info!("[qc-18] Dispatcher received shutdown signal");
                break Some(job);
            }
            permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => {
                    warn!("[qc-18] Dispatch semaphore closed");
                    break Some(job);
                }
            },
        };

        let sender = Arc::clone(&sender);
        let config = Arc::clone(&config);
        let log = Arc::clone(&log);
        let time = Arc::clone(&time);

        tokio::spawn(async move {
            let _permit = permit;
            let record = deliver(sender.as_ref(), &config, job, time.as_ref()).await;
            log.push(record);
        });
    };

    // Queued jobs never run past this point.
    rx.close();
    let mut pending: Vec<DispatchJob> = stranded.into_iter().collect();
    while let Ok(job) = rx.try_recv() {
        pending.push(job);
    }
    for job in pending {
        record_dropped(&log, job, DISPATCHER_STOPPED, time.now());
    }

    debug!("[qc-18] Dispatch worker loop exited");
}

fn record_dropped(log: &DeliveryLog, job: DispatchJob, reason: &str, now: u64) {
    warn!(
        url = %job.url,
        tx_id = %job.payload.tx_id,
        reason,
        "[qc-18] Callback dropped"
    );
    log.push(DeliveryRecord {
        url: job.url,
        address: job.payload.address,
        tx_id: job.payload.tx_id,
        attempts: 0,
        outcome: DeliveryOutcome::Dropped {
            reason: reason.to_string(),
        },
        finished_at: now,
    });
}

/// Attempt one delivery, retrying transport failures with backoff.
async fn deliver(
    sender: &dyn CallbackSender,
    config: &DispatchConfig,
    job: DispatchJob,
    time: &dyn TimeSource,
) -> DeliveryRecord {
    let mut attempts = 0;

    let outcome = loop {
        attempts += 1;
        match sender.send(&job.url, &job.payload).await {
            Ok(status) => {
                debug!(
                    url = %job.url,
                    tx_id = %job.payload.tx_id,
                    status,
                    attempts,
                    "[qc-18] Callback delivered"
                );
                break DeliveryOutcome::Delivered { status };
            }
            Err(e) if attempts < config.max_attempts => {
                let delay = config.backoff_for(attempts);
                debug!(
                    url = %job.url,
                    error = %e,
                    attempts,
                    retry_in_ms = delay.as_millis() as u64,
                    "[qc-18] Callback attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                warn!(
                    url = %job.url,
                    tx_id = %job.payload.tx_id,
                    error = %e,
                    attempts,
                    "[qc-18] Address callback failed"
                );
                break DeliveryOutcome::Abandoned {
                    error: e.to_string(),
                };
            }
        }
    };

    DeliveryRecord {
        url: job.url,
        address: job.payload.address,
        tx_id: job.payload.tx_id,
        attempts,
        outcome,
        finished_at: time.now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DeliveryError;
    use crate::ports::SystemTimeSource;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Fails the first `failures` calls, then succeeds with 200.
    struct FlakySender {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl CallbackSender for FlakySender {
        async fn send(&self, _url: &str, _payload: &CallbackPayload) -> Result<u16, DeliveryError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(DeliveryError::Transport("connection refused".into()))
            } else {
                Ok(200)
            }
        }
    }

    fn payload() -> CallbackPayload {
        CallbackPayload {
            asset_id: "X".into(),
            amount: 100,
            address: "A".into(),
            tx_id: "tx1".into(),
        }
    }

    fn config(max_attempts: u32) -> DispatchConfig {
        DispatchConfig {
            max_attempts,
            initial_backoff_ms: 10,
            max_backoff_ms: 100,
            ..Default::default()
        }
    }

    async fn wait_for_records(log: &DeliveryLog, count: usize) {
        for _ in 0..500 {
            if log.len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {} delivery records, found {}", count, log.len());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_then_delivers() {
        let sender = Arc::new(FlakySender {
            failures: 2,
            calls: AtomicU32::new(0),
        });
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = Dispatcher::spawn(
            sender.clone(),
            config(3),
            Arc::new(SystemTimeSource),
            shutdown_rx,
        );

        assert!(handle.dispatch("https://example.com", payload()));
        let log = handle.delivery_log();
        wait_for_records(&log, 1).await;

        let record = &log.recent()[0];
        assert_eq!(record.attempts, 3);
        assert_eq!(record.outcome, DeliveryOutcome::Delivered { status: 200 });
        assert_eq!(sender.calls.load(Ordering::SeqCst), 3);
        assert!(log.dead_letters().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandons_after_max_attempts() {
        let sender = Arc::new(FlakySender {
            failures: u32::MAX,
            calls: AtomicU32::new(0),
        });
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = Dispatcher::spawn(
            sender.clone(),
            config(2),
            Arc::new(SystemTimeSource),
            shutdown_rx,
        );

        handle.dispatch("https://example.com", payload());
        let log = handle.delivery_log();
        wait_for_records(&log, 1).await;

        assert_eq!(sender.calls.load(Ordering::SeqCst), 2);
        let dead = log.dead_letters();
        assert_eq!(dead.len(), 1);
        assert!(matches!(dead[0].outcome, DeliveryOutcome::Abandoned { .. }));
    }

    #[test]
    fn test_full_queue_drops_without_blocking() {
        let (jobs, _rx) = mpsc::channel(1);
        let handle = DispatcherHandle {
            jobs,
            log: Arc::new(DeliveryLog::new(8)),
            time: Arc::new(SystemTimeSource),
        };

        assert!(handle.dispatch("https://example.com/1", payload()));
        assert!(!handle.dispatch("https://example.com/2", payload()));

        let dead = handle.delivery_log().dead_letters();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].url, "https://example.com/2");
        assert_eq!(dead[0].attempts, 0);
    }

    #[test]
    fn test_closed_queue_drops() {
        let (jobs, rx) = mpsc::channel(4);
        drop(rx);
        let handle = DispatcherHandle {
            jobs,
            log: Arc::new(DeliveryLog::new(8)),
            time: Arc::new(SystemTimeSource),
        };

        assert!(!handle.dispatch("https://example.com", payload()));
        assert!(matches!(
            handle.delivery_log().recent()[0].outcome,
            DeliveryOutcome::Dropped { .. }
        ));
    }

    #[test]
    fn test_delivery_log_evicts_oldest() {
        let log = DeliveryLog::new(2);
        for i in 0..3 {
            log.push(DeliveryRecord {
                url: format!("https://example.com/{}", i),
                address: "A".into(),
                tx_id: "tx".into(),
                attempts: 1,
                outcome: DeliveryOutcome::Delivered { status: 200 },
                finished_at: 0,
            });
        }
        let urls: Vec<_> = log.recent().into_iter().map(|r| r.url).collect();
        assert_eq!(urls, ["https://example.com/1", "https://example.com/2"]);
    }

    #[tokio::test]
    async fn test_shutdown_records_queued_jobs_as_dropped() {
        let (jobs, rx) = mpsc::channel(4);
        let log = Arc::new(DeliveryLog::new(8));
        let time: Arc<dyn TimeSource> = Arc::new(SystemTimeSource);
        let handle = DispatcherHandle {
            jobs,
            log: Arc::clone(&log),
            time: Arc::clone(&time),
        };
        assert!(handle.dispatch("https://example.com/1", payload()));
        assert!(handle.dispatch("https://example.com/2", payload()));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        shutdown_tx.send(true).unwrap();
        let sender = Arc::new(FlakySender {
            failures: 0,
            calls: AtomicU32::new(0),
        });
        run_workers(
            rx,
            sender.clone(),
            Arc::new(config(1)),
            Arc::clone(&log),
            time,
            shutdown_rx,
        )
        .await;

        assert_eq!(sender.calls.load(Ordering::SeqCst), 0);
        let dead = log.dead_letters();
        assert_eq!(dead.len(), 2);
        assert!(dead.iter().all(|r| r.outcome
            == DeliveryOutcome::Dropped {
                reason: "dispatcher stopped".into()
            }));

        assert!(!handle.dispatch("https://example.com/3", payload()));
        assert_eq!(log.dead_letters().len(), 3);
    }
}
