//! A single key slot: the secret, its fingerprint, and an optional label.

use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Number of addressable slots (0..31), mirroring the 5-bit wire slot field.
pub const SLOT_COUNT: usize = 32;

/// An occupied key slot.
///
/// `secret` is zeroized on drop; `key_id` is a short, non-secret
/// fingerprint safe to log or display, derived as the first 8 hex
/// characters of `SHA256(secret)`.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeySlot {
    pub index: u8,
    pub secret: Vec<u8>,
    #[zeroize(skip)]
    pub label: Option<String>,
    #[zeroize(skip)]
    pub key_id: String,
    #[zeroize(skip)]
    pub evidence_count: u64,
    #[zeroize(skip)]
    pub last_evidence_at: Option<u64>,
}

impl KeySlot {
    pub fn new(index: u8, secret: Vec<u8>, label: Option<String>) -> Self {
        let key_id = key_id(&secret);
        Self {
            index,
            secret,
            label,
            key_id,
            evidence_count: 0,
            last_evidence_at: None,
        }
    }
}

impl std::fmt::Debug for KeySlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeySlot")
            .field("index", &self.index)
            .field("secret", &"<redacted>")
            .field("label", &self.label)
            .field("key_id", &self.key_id)
            .finish()
    }
}

/// Derives the short, non-secret fingerprint used to detect duplicate keys
/// without ever comparing or logging the raw secret.
pub fn key_id(secret: &[u8]) -> String {
    let digest = Sha256::digest(secret);
    hex::encode(&digest[..4])
}
