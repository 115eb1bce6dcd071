//! # Domain Entities
//!
//! Transactions as seen by the listener, the payload posted to callback
//! URLs, and the records kept about deliveries and seen transactions.

use serde::{Deserialize, Serialize};

/// A transaction input enriched with address, asset and amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedInput {
    pub address: String,
    pub asset_id: String,
    pub amount: u64,
}

/// A transaction output enriched with address, asset and amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedOutput {
    pub address: String,
    pub asset_id: String,
    pub amount: u64,
}

/// Result of running a confirmed transaction through the annotator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedTransaction {
    pub tx_id: String,
    pub inputs: Vec<AnnotatedInput>,
    pub outputs: Vec<AnnotatedOutput>,
}

impl AnnotatedTransaction {
    /// True if `address` funds this transaction (change or self-transfer).
    pub fn has_input_from(&self, address: &str) -> bool {
        self.inputs.iter().any(|input| input.address == address)
    }
}

/// Body POSTed to every registered callback URL.
///
/// Field order is part of the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackPayload {
    pub asset_id: String,
    pub amount: u64,
    pub address: String,
    pub tx_id: String,
}

impl CallbackPayload {
    /// Build the payload for one paid output.
    pub fn for_output(output: &AnnotatedOutput, tx_id: &str) -> Self {
        Self {
            asset_id: output.asset_id.clone(),
            amount: output.amount,
            address: output.address.clone(),
            tx_id: tx_id.to_string(),
        }
    }
}

/// Value stored per transaction id in the dedup store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenTxRecord {
    /// First-seen time, seconds since the Unix epoch.
    pub unixtime: u64,
}

impl SeenTxRecord {
    /// Whether the record is older than `ttl_secs` at `now`.
    pub fn is_expired(&self, now: u64, ttl_secs: u64) -> bool {
        now.saturating_sub(self.unixtime) > ttl_secs
    }
}

/// Final state of one (URL, payload) delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// Request completed at the transport level. Status is informational.
    Delivered { status: u16 },
    /// Every attempt failed at the transport level.
    Abandoned { error: String },
    /// Never attempted: the dispatch queue was full or closed.
    Dropped { reason: String },
}

impl DeliveryOutcome {
    /// Dead-letter outcomes: the endpoint never received the payload.
    pub fn is_dead_letter(&self) -> bool {
        !matches!(self, DeliveryOutcome::Delivered { .. })
    }
}

/// Entry in the delivery log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub url: String,
    pub address: String,
    pub tx_id: String,
    pub attempts: u32,
    #[serde(flatten)]
    pub outcome: DeliveryOutcome,
    /// Seconds since the Unix epoch.
    pub finished_at: u64,
}

/// What the listener did with one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Transaction id was already in the dedup store.
    Duplicate,
    /// Annotation failed; nothing dispatched.
    Skipped,
    /// Transaction was processed; `dispatched` jobs were handed to the dispatcher.
    Processed { dispatched: usize },
}

/// Result of one reaper pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReapStats {
    pub scanned: usize,
    pub expired: usize,
    pub corrupt: usize,
}

impl ReapStats {
    pub fn purged(&self) -> usize {
        self.expired + self.corrupt
    }
}
