//! # Value Objects
//!
//! Limits and tunables for the listener, reaper and dispatcher.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Addresses shorter than this are rejected by the registry.
pub const MIN_ADDRESS_LEN: usize = 42;

/// Default inbound transaction queue capacity.
pub const DEFAULT_TX_QUEUE_CAPACITY: usize = 10_000;

/// Default time a seen-transaction record is kept (48 hours).
pub const DEFAULT_SEEN_TX_TTL_SECS: u64 = 48 * 60 * 60;

/// Default reaper period (1 hour).
pub const DEFAULT_REAP_INTERVAL_SECS: u64 = 60 * 60;

/// Default per-request callback timeout.
pub const DEFAULT_DISPATCH_TIMEOUT_SECS: u64 = 30;

/// Default `Referer` header identifying this node to callback endpoints.
pub const DEFAULT_REFERER: &str = "Quantum-Chain Node";

/// Listener and reaper configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Inbound queue capacity.
    pub queue_capacity: usize,
    /// Seen-transaction TTL in seconds.
    pub seen_tx_ttl_secs: u64,
    /// Reaper period in seconds.
    pub reap_interval_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_TX_QUEUE_CAPACITY,
            seen_tx_ttl_secs: DEFAULT_SEEN_TX_TTL_SECS,
            reap_interval_secs: DEFAULT_REAP_INTERVAL_SECS,
        }
    }
}

impl ListenerConfig {
    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs)
    }

    /// Reject zero capacities and periods.
    pub fn validate(&self) -> Result<(), String> {
        if self.queue_capacity == 0 {
            return Err("listener.queue_capacity cannot be 0".into());
        }
        if self.reap_interval_secs == 0 {
            return Err("listener.reap_interval_secs cannot be 0".into());
        }
        if self.seen_tx_ttl_secs == 0 {
            return Err("listener.seen_tx_ttl_secs cannot be 0".into());
        }
        Ok(())
    }
}

/// Callback delivery configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// `Referer` header value.
    pub referer: String,
    /// Skip TLS certificate verification. Off unless explicitly enabled.
    pub accept_invalid_certs: bool,
    /// Pending dispatch jobs before new jobs are dropped.
    pub queue_capacity: usize,
    /// Maximum deliveries in flight at once.
    pub max_concurrent: usize,
    /// Attempts per delivery, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry, doubled after each failure.
    pub initial_backoff_ms: u64,
    /// Upper bound for the retry delay.
    pub max_backoff_ms: u64,
    /// Delivery records kept in memory.
    pub delivery_log_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_DISPATCH_TIMEOUT_SECS,
            referer: DEFAULT_REFERER.to_string(),
            accept_invalid_certs: false,
            queue_capacity: 10_000,
            max_concurrent: 64,
            max_attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 30_000,
            delivery_log_capacity: 1_024,
        }
    }
}

impl DispatchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let factor = 1u64 << retry.saturating_sub(1).min(20);
        let delay = self.initial_backoff_ms.saturating_mul(factor);
        Duration::from_millis(delay.min(self.max_backoff_ms))
    }

    /// Reject zero capacities and timeouts.
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_secs == 0 {
            return Err("dispatch.timeout_secs cannot be 0".into());
        }
        if self.queue_capacity == 0 {
            return Err("dispatch.queue_capacity cannot be 0".into());
        }
        if self.max_concurrent == 0 {
            return Err("dispatch.max_concurrent cannot be 0".into());
        }
        if self.max_attempts == 0 {
            return Err("dispatch.max_attempts cannot be 0".into());
        }
        Ok(())
    }
}
