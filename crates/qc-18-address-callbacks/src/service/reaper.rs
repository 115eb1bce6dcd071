//! Periodic purge of expired seen-transaction records.

use crate::domain::{ListenerConfig, ReapStats};
use crate::ports::TimeSource;
use crate::service::SeenTransactionStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Shortest period between purge passes.
const MIN_REAP_INTERVAL: Duration = Duration::from_secs(1);

/// Bounds the dedup store by deleting records older than the TTL.
pub struct Reaper {
    seen: Arc<SeenTransactionStore>,
    time: Arc<dyn TimeSource>,
    ttl_secs: u64,
    interval: Duration,
}

impl Reaper {
    pub fn new(
        seen: Arc<SeenTransactionStore>,
        time: Arc<dyn TimeSource>,
        config: &ListenerConfig,
    ) -> Self {
        Self {
            seen,
            time,
            ttl_secs: config.seen_tx_ttl_secs,
            interval: config.reap_interval().max(MIN_REAP_INTERVAL),
        }
    }

    /// Run one purge pass as of `now`.
    ///
    /// A failed scan or delete is logged and reported as `None`; the next
    /// tick tries again.
    pub fn reap_once(&self, now: u64) -> Option<ReapStats> {
        match self.seen.purge_expired(now, self.ttl_secs) {
            Ok(stats) => {
                if stats.purged() > 0 {
                    info!(
                        scanned = stats.scanned,
                        expired = stats.expired,
                        corrupt = stats.corrupt,
                        "[qc-18] Purged seen-transaction records"
                    );
                } else {
                    debug!(scanned = stats.scanned, "[qc-18] Nothing to purge");
                }
                Some(stats)
            }
            Err(e) => {
                warn!(error = %e, "[qc-18] Seen-transaction purge failed");
                None
            }
        }
    }

    /// Start the periodic task. The first pass runs one interval after start.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            interval_secs = self.interval.as_secs(),
            ttl_secs = self.ttl_secs,
            "[qc-18] Reaper started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.reap_once(self.time.now());
                }
                _ = shutdown.changed() => {
                    info!("[qc-18] Reaper received shutdown signal");
                    break;
                }
            }
        }
    }
}
