//! # Inbound Ports (Driving Ports)
//!
//! Public API exposed by the Address Callbacks subsystem to the registration
//! surface (HTTP routes, CLI).

use crate::domain::CallbackError;

/// Registry of callback URLs per watched address.
///
/// Each operation maps 1:1 onto a registration endpoint; errors are surfaced
/// to callers verbatim.
pub trait CallbackRegistryApi: Send + Sync {
    /// Register `url` for `address`. Returns `true` when inserted.
    fn add(&self, address: &str, url: &str) -> Result<bool, CallbackError>;

    /// URLs registered for `address`, in registration order.
    fn list(&self, address: &str) -> Result<Vec<String>, CallbackError>;

    /// Remove `url` from `address`.
    fn delete(&self, address: &str, url: &str) -> Result<(), CallbackError>;
}
