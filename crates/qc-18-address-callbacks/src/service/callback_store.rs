//! # Callback Store
//!
//! Persisted registry of watched addresses. Each address maps to an ordered,
//! duplicate-free list of callback URLs stored as a JSON array.
//!
//! ## Invariants
//!
//! - Registration order is preserved by `list`.
//! - An address with no URLs has no key in the store.
//! - `add`/`delete` on the same address are serialized by a striped lock, so
//!   concurrent registration changes never lose updates.

use crate::domain::{is_url, CallbackError, MIN_ADDRESS_LEN};
use crate::ports::{CallbackRegistryApi, KeyValueStore, PrefixedStore, CALLBACK_NAMESPACE};
use parking_lot::Mutex;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::debug;

/// Number of lock stripes guarding read-modify-write sequences.
const LOCK_STRIPES: usize = 64;

/// Fixed table of mutexes indexed by address hash.
struct AddressLocks {
    stripes: Vec<Mutex<()>>,
}

impl AddressLocks {
    fn new(count: usize) -> Self {
        Self {
            stripes: (0..count).map(|_| Mutex::new(())).collect(),
        }
    }

    fn stripe(&self, address: &str) -> &Mutex<()> {
        let mut hasher = DefaultHasher::new();
        address.hash(&mut hasher);
        let index = (hasher.finish() as usize) % self.stripes.len();
        &self.stripes[index]
    }
}

/// Callback registry backed by a [`KeyValueStore`] namespace.
pub struct CallbackStore {
    db: PrefixedStore,
    locks: AddressLocks,
}

impl CallbackStore {
    /// Create a store using the callback namespace of `kv`.
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            db: PrefixedStore::new(kv, CALLBACK_NAMESPACE),
            locks: AddressLocks::new(LOCK_STRIPES),
        }
    }

    fn check_address(address: &str) -> Result<(), CallbackError> {
        if address.len() < MIN_ADDRESS_LEN {
            return Err(CallbackError::BadAddress);
        }
        Ok(())
    }

    fn load(&self, address: &str) -> Result<Option<Vec<String>>, CallbackError> {
        match self.db.get(address.as_bytes())? {
            Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            None => Ok(None),
        }
    }

    fn save(&self, address: &str, urls: &[String]) -> Result<(), CallbackError> {
        let value = serde_json::to_vec(urls)?;
        self.db.put(address.as_bytes(), &value)?;
        Ok(())
    }

    /// Every address that currently has at least one callback.
    pub fn watched_addresses(&self) -> Result<Vec<String>, CallbackError> {
        Ok(self
            .db
            .scan()?
            .into_iter()
            .map(|(key, _)| String::from_utf8_lossy(&key).into_owned())
            .collect())
    }
}

impl CallbackRegistryApi for CallbackStore {
    fn add(&self, address: &str, url: &str) -> Result<bool, CallbackError> {
        Self::check_address(address)?;
        if !is_url(url) {
            return Err(CallbackError::InvalidUrl);
        }

        let _guard = self.locks.stripe(address).lock();
        let mut urls = self.load(address)?.unwrap_or_default();
        if urls.iter().any(|existing| existing == url) {
            return Err(CallbackError::DuplicateUrl);
        }
        urls.push(url.to_string());
        self.save(address, &urls)?;

        debug!(address, url, total = urls.len(), "[qc-18] Callback registered");
        Ok(true)
    }

    fn list(&self, address: &str) -> Result<Vec<String>, CallbackError> {
        Self::check_address(address)?;
        Ok(self.load(address)?.unwrap_or_default())
    }

    fn delete(&self, address: &str, url: &str) -> Result<(), CallbackError> {
        Self::check_address(address)?;

        let _guard = self.locks.stripe(address).lock();
        let urls = self
            .load(address)?
            .ok_or(CallbackError::NoCallbacksRegistered)?;

        let remaining: Vec<String> = urls.iter().filter(|u| *u != url).cloned().collect();
        if remaining.len() == urls.len() {
            return Err(CallbackError::CallbackNotFound);
        }

        if remaining.is_empty() {
            self.db.delete(address.as_bytes())?;
        } else {
            self.save(address, &remaining)?;
        }

        debug!(address, url, remaining = remaining.len(), "[qc-18] Callback removed");
        Ok(())
    }
}
