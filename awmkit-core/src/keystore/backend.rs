//! Pluggable persistence for the key store.
//!
//! [`KeyStoreBackend`] is a duck-typed seam: the in-memory implementation
//! here is the only one shipped in this crate. Platform-specific secret
//! stores (OS keychains, HSMs, vaults) are out of scope for this crate and
//! implement the same trait from outside it.

use super::slot::KeySlot;
use crate::error::AwmError;

/// Storage contract for key slots.
///
/// Implementations do not need to be transactional across calls; the
/// [`super::store::KeyStore`] that owns a backend serializes access with
/// its own lock.
pub trait KeyStoreBackend: Send + Sync {
    /// Loads every currently-occupied slot, in no particular order.
    fn load_all(&self) -> Result<Vec<KeySlot>, AwmError>;

    /// Persists `slot`, overwriting whatever previously occupied that index.
    fn save_slot(&mut self, slot: KeySlot) -> Result<(), AwmError>;

    /// Removes whatever occupies `index`, if anything.
    fn delete_slot(&mut self, index: u8) -> Result<(), AwmError>;

    /// Returns the currently active slot index, if one has been set.
    fn load_active(&self) -> Result<Option<u8>, AwmError>;

    /// Sets the active slot index.
    fn save_active(&mut self, index: u8) -> Result<(), AwmError>;

    /// A short, human-readable name for this backend (e.g. `"memory"`),
    /// used in diagnostics and the key slot summary JSON.
    fn backend_label(&self) -> &'static str;
}

/// Process-local, non-persistent backend. Suitable for tests and for
/// short-lived tooling that is given keys on every invocation.
#[derive(Default)]
pub struct InMemoryKeyStoreBackend {
    slots: std::collections::BTreeMap<u8, KeySlot>,
    active: Option<u8>,
}

impl InMemoryKeyStoreBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStoreBackend for InMemoryKeyStoreBackend {
    fn load_all(&self) -> Result<Vec<KeySlot>, AwmError> {
        Ok(self.slots.values().cloned().collect())
    }

    fn save_slot(&mut self, slot: KeySlot) -> Result<(), AwmError> {
        self.slots.insert(slot.index, slot);
        Ok(())
    }

    fn delete_slot(&mut self, index: u8) -> Result<(), AwmError> {
        self.slots.remove(&index);
        if self.active == Some(index) {
            self.active = None;
        }
        Ok(())
    }

    fn load_active(&self) -> Result<Option<u8>, AwmError> {
        Ok(self.active)
    }

    fn save_active(&mut self, index: u8) -> Result<(), AwmError> {
        self.active = Some(index);
        Ok(())
    }

    fn backend_label(&self) -> &'static str {
        "memory"
    }
}
