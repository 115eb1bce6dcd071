//! Wire types for the registration API.

use serde::{Deserialize, Serialize};

/// Body for `/add-address-callback` and `/remove-address-callback`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressCallbackRequest {
    pub address: String,
    pub url: String,
}

/// Body for `/list-address-callbacks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListCallbacksRequest {
    pub address: String,
}

/// Response envelope used by every registration route.
#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Envelope<T> {
    Success { data: T },
    Fail { code: String, msg: String },
}

/// One entry of `/delivery-log`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeliveryRecord {
    pub url: String,
    pub address: String,
    pub tx_id: String,
    pub attempts: u32,
    pub outcome: String,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    pub finished_at: u64,
}
