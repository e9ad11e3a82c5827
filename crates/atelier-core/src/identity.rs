//! Local identity persistence contract.
//!
//! The chosen display name is the only piece of identity that outlives a
//! session. It is stored under a fixed key in whatever per-device key-value
//! slot the application has (browser local storage, a dotfile, ...) and
//! reused on the next session from the same device. Everything else about a
//! user is ephemeral.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

/// Fixed key the username preference is stored under.
pub const USERNAME_KEY: &str = "username";

/// Per-device key-value slot for identity preferences.
pub trait IdentityStore: Send + Sync {
    /// Load a stored value, if present.
    fn load(&self, key: &str) -> Option<String>;

    /// Store a value, replacing any previous one.
    fn store(&self, key: &str, value: &str);
}

/// Read the persisted username preference.
pub fn persisted_username(store: &(impl IdentityStore + ?Sized)) -> Option<String> {
    store.load(USERNAME_KEY)
}

/// Persist the username preference for future sessions.
pub fn remember_username(store: &(impl IdentityStore + ?Sized), username: &str) {
    store.store(USERNAME_KEY, username);
}

/// In-memory identity store, for tests and ephemeral runtimes.
#[derive(Debug, Clone, Default)]
pub struct MemoryIdentityStore {
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryIdentityStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn load(&self, key: &str) -> Option<String> {
        self.slots.lock().ok()?.get(key).cloned()
    }

    fn store(&self, key: &str, value: &str) {
        if let Ok(mut slots) = self.slots.lock() {
            slots.insert(key.to_string(), value.to_string());
        }
    }
}
