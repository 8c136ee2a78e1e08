//! The 32-slot HMAC key store: pluggable persistence, duplicate detection,
//! and active-slot fallback.

pub mod backend;
pub mod slot;
pub mod store;

pub use backend::{InMemoryKeyStoreBackend, KeyStoreBackend};
pub use slot::{KeySlot, SLOT_COUNT, key_id};
pub use store::KeyStore;
