//! # Domain Errors
//!
//! Error types for the Address Callbacks subsystem.
//!
//! Registry errors (`CallbackError`) are returned synchronously to the caller
//! of the callback store and surfaced verbatim by the registration API.
//! Delivery errors (`DeliveryError`) never leave the dispatcher.

use std::fmt;
use thiserror::Error;

/// Errors returned by the callback registry.
#[derive(Debug, Error)]
pub enum CallbackError {
    /// Address is shorter than the minimum accepted length.
    #[error("invalid address")]
    BadAddress,

    /// Callback URL failed validation.
    #[error("not a valid url")]
    InvalidUrl,

    /// URL is already registered for the address.
    #[error("url is already in the list")]
    DuplicateUrl,

    /// Delete was called on an address with no registration.
    #[error("no callbacks listed for address")]
    NoCallbacksRegistered,

    /// Delete was called with a URL that is not registered.
    #[error("cannot find the callback url for deletion")]
    CallbackNotFound,

    /// Persisted registration could not be encoded or decoded.
    #[error("serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backing key/value store failed.
    #[error(transparent)]
    Storage(#[from] KVStoreError),
}

impl CallbackError {
    /// Stable error code for API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            CallbackError::BadAddress => "BAD_ADDRESS",
            CallbackError::InvalidUrl => "INVALID_URL",
            CallbackError::DuplicateUrl => "DUPLICATE_URL",
            CallbackError::NoCallbacksRegistered => "NO_CALLBACKS_REGISTERED",
            CallbackError::CallbackNotFound => "CALLBACK_NOT_FOUND",
            CallbackError::Serialization(_) => "SERIALIZATION_FAILURE",
            CallbackError::Storage(_) => "STORAGE_FAILURE",
        }
    }

    /// Whether the error was caused by the caller's input rather than the node.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            CallbackError::Serialization(_) | CallbackError::Storage(_)
        )
    }
}

/// Key/value store adapter errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KVStoreError {
    /// I/O error during read/write.
    IOError { message: String },
    /// Data corruption in the store.
    CorruptionError { message: String },
}

impl fmt::Display for KVStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KVStoreError::IOError { message } => write!(f, "KV store I/O error: {}", message),
            KVStoreError::CorruptionError { message } => {
                write!(f, "KV store corruption: {}", message)
            }
        }
    }
}

impl std::error::Error for KVStoreError {}

/// Errors from the seen-transaction (dedup) store.
#[derive(Debug, Error)]
pub enum SeenStoreError {
    /// Record could not be encoded or decoded.
    #[error("seen-transaction record serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backing key/value store failed.
    #[error(transparent)]
    Storage(#[from] KVStoreError),
}

/// Transport-level delivery failure. Terminal inside the dispatcher.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// HTTP request could not be completed.
    #[error("callback transport failed: {0}")]
    Transport(String),

    /// Payload could not be encoded.
    #[error("callback payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The annotation collaborator could not turn a transaction into
/// address/asset/amount tuples.
#[derive(Debug, Error)]
pub enum AnnotationError {
    /// Transaction carries no usable id.
    #[error("transaction has no id")]
    MissingTransactionId,

    /// An input or output is missing required fields.
    #[error("malformed annotation: {0}")]
    Malformed(String),
}

/// Errors returned when handing a transaction to the listener.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListenerError {
    /// Inbound queue is at capacity (non-blocking submit only).
    #[error("transaction queue is full")]
    QueueFull,

    /// The consumer loop has stopped.
    #[error("transaction listener is not running")]
    ListenerClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_codes_are_distinct() {
        let errors = [
            CallbackError::BadAddress,
            CallbackError::InvalidUrl,
            CallbackError::DuplicateUrl,
            CallbackError::NoCallbacksRegistered,
            CallbackError::CallbackNotFound,
            CallbackError::Storage(KVStoreError::IOError {
                message: "disk".into(),
            }),
        ];
        let kinds: std::collections::HashSet<_> = errors.iter().map(|e| e.kind()).collect();
        assert_eq!(kinds.len(), errors.len());
    }

    #[test]
    fn test_storage_error_is_not_client_error() {
        let err: CallbackError = KVStoreError::IOError {
            message: "disk failure".to_string(),
        }
        .into();

        assert!(!err.is_client_error());
        assert!(err.to_string().contains("disk failure"));
        assert!(CallbackError::DuplicateUrl.is_client_error());
    }
}
