//! The 32-slot key store engine: generation, import, duplicate detection,
//! and active-slot fallback.

use parking_lot::RwLock;
use rand::RngCore;
use rand::rngs::OsRng;

use super::backend::KeyStoreBackend;
use super::slot::{KeySlot, SLOT_COUNT};
use crate::error::AwmError;

const SECRET_LEN: usize = 32;

/// Generic over its persistence backend, the way the consensus engine is
/// generic over its store/validator/fork-choice triple.
pub struct KeyStore<B: KeyStoreBackend> {
    backend: RwLock<B>,
}

impl<B: KeyStoreBackend> KeyStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend: RwLock::new(backend),
        }
    }

    /// Generates a fresh random 32-byte secret and stores it at `index`.
    ///
    /// Fails with [`AwmError::KeyAlreadyExists`] if `index` is already
    /// occupied, or in the astronomically unlikely event the fresh secret
    /// collides with an existing one's `key_id`.
    pub fn generate_and_save_slot(
        &self,
        index: u8,
        label: Option<String>,
    ) -> Result<KeySlot, AwmError> {
        let mut secret = vec![0u8; SECRET_LEN];
        OsRng.fill_bytes(&mut secret);
        self.import_slot(index, secret, label)
    }

    /// Stores a caller-supplied secret at `index`. Used by
    /// [`generate_and_save_slot`](Self::generate_and_save_slot) and by
    /// callers restoring a key from an external secret manager.
    pub fn import_slot(
        &self,
        index: u8,
        secret: Vec<u8>,
        label: Option<String>,
    ) -> Result<KeySlot, AwmError> {
        if index as usize >= SLOT_COUNT {
            return Err(AwmError::InvalidMessageLength);
        }
        let mut backend = self.backend.write();
        let existing = backend.load_all()?;
        if existing.iter().any(|s| s.index == index) {
            return Err(AwmError::KeyAlreadyExists);
        }
        // Two slots may legitimately share a secret (e.g. key rotation in
        // progress); duplicates are reported via `summary`'s
        // `duplicate_of_slots`, not rejected here.
        let slot = KeySlot::new(index, secret, label);
        backend.save_slot(slot.clone())?;
        Ok(slot)
    }

    /// Removes whatever occupies `index`. If `index` was the active slot,
    /// the new active slot becomes the lowest-index remaining populated
    /// slot, or `0` if none remain. Returns the post-delete active index.
    pub fn delete_slot(&self, index: u8) -> Result<u8, AwmError> {
        let mut backend = self.backend.write();
        let was_active = backend.load_active()? == Some(index);
        backend.delete_slot(index)?;

        if !was_active {
            return Ok(backend.load_active()?.unwrap_or(0));
        }

        let mut remaining: Vec<u8> = backend.load_all()?.iter().map(|s| s.index).collect();
        remaining.sort_unstable();
        let new_active = remaining.first().copied().unwrap_or(0);
        backend.save_active(new_active)?;
        Ok(new_active)
    }

    pub fn label_slot(&self, index: u8, label: Option<String>) -> Result<(), AwmError> {
        let mut backend = self.backend.write();
        let mut slot = backend
            .load_all()?
            .into_iter()
            .find(|s| s.index == index)
            .ok_or(AwmError::NullPointer)?;
        slot.label = label;
        backend.save_slot(slot)
    }

    /// Marks `index` as the active slot. The slot must already be occupied.
    pub fn set_active(&self, index: u8) -> Result<(), AwmError> {
        let occupied = {
            let backend = self.backend.read();
            backend.load_all()?.iter().any(|s| s.index == index)
        };
        if !occupied {
            return Err(AwmError::NullPointer);
        }
        self.backend.write().save_active(index)
    }

    /// Resolves the key to use for the next operation.
    ///
    /// Returns the explicitly active slot if one is set and still occupied.
    /// Otherwise, if the store holds exactly one key, that key is used as
    /// an implicit fallback. With zero or multiple unlabeled keys and no
    /// explicit active slot, this is ambiguous and returns an error.
    pub fn active_key(&self) -> Result<KeySlot, AwmError> {
        let backend = self.backend.read();
        let slots = backend.load_all()?;
        if let Some(active_index) = backend.load_active()? {
            if let Some(slot) = slots.iter().find(|s| s.index == active_index) {
                return Ok(slot.clone());
            }
        }
        match slots.as_slice() {
            [only] => Ok(only.clone()),
            _ => Err(AwmError::NullPointer),
        }
    }

    pub fn slot(&self, index: u8) -> Result<KeySlot, AwmError> {
        self.backend
            .read()
            .load_all()?
            .into_iter()
            .find(|s| s.index == index)
            .ok_or(AwmError::NullPointer)
    }

    /// Records that an evidence row was produced under `index`'s key,
    /// bumping its evidence counter and last-evidence timestamp.
    pub fn record_evidence(&self, index: u8, at_unix: u64) -> Result<(), AwmError> {
        let mut backend = self.backend.write();
        let mut slot = backend
            .load_all()?
            .into_iter()
            .find(|s| s.index == index)
            .ok_or(AwmError::NullPointer)?;
        slot.evidence_count += 1;
        slot.last_evidence_at = Some(at_unix);
        backend.save_slot(slot)
    }

    /// Builds the key slot summary JSON described by the external
    /// interface: one object per slot (0..32) with its occupancy, active
    /// flag, evidence stats, and any other slots sharing the same key.
    pub fn summary(&self) -> Result<serde_json::Value, AwmError> {
        let backend = self.backend.read();
        let slots = backend.load_all()?;
        let active = backend.load_active()?;

        let entries: Vec<serde_json::Value> = (0..SLOT_COUNT as u8)
            .map(|index| {
                let occupied = slots.iter().find(|s| s.index == index);
                let is_active = Some(index) == active;
                let duplicate_of_slots: Vec<u8> = match occupied {
                    Some(s) => slots
                        .iter()
                        .filter(|other| other.index != index && other.key_id == s.key_id)
                        .map(|other| other.index)
                        .collect(),
                    None => Vec::new(),
                };
                let status_text = match (occupied, is_active) {
                    (Some(_), true) => "active",
                    (Some(_), false) => "occupied",
                    (None, _) => "empty",
                };
                serde_json::json!({
                    "slot": index,
                    "is_active": is_active,
                    "has_key": occupied.is_some(),
                    "key_id": occupied.map(|s| s.key_id.clone()),
                    "label": occupied.and_then(|s| s.label.clone()),
                    "evidence_count": occupied.map(|s| s.evidence_count).unwrap_or(0),
                    "last_evidence_at": occupied.and_then(|s| s.last_evidence_at),
                    "status_text": status_text,
                    "duplicate_of_slots": duplicate_of_slots,
                })
            })
            .collect();
        Ok(serde_json::Value::Array(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystore::backend::InMemoryKeyStoreBackend;

    fn store() -> KeyStore<InMemoryKeyStoreBackend> {
        KeyStore::new(InMemoryKeyStoreBackend::new())
    }

    #[test]
    fn generate_rejects_occupied_slot() {
        let store = store();
        store.generate_and_save_slot(0, None).unwrap();
        assert!(matches!(
            store.generate_and_save_slot(0, None),
            Err(AwmError::KeyAlreadyExists)
        ));
    }

    #[test]
    fn import_allows_a_shared_secret_across_slots() {
        let store = store();
        store
            .import_slot(0, b"shared-secret-bytes".to_vec(), None)
            .unwrap();
        store
            .import_slot(1, b"shared-secret-bytes".to_vec(), None)
            .unwrap();
        let summary = store.summary().unwrap();
        assert_eq!(summary[0]["duplicate_of_slots"], serde_json::json!([1]));
        assert_eq!(summary[1]["duplicate_of_slots"], serde_json::json!([0]));
    }

    #[test]
    fn active_key_falls_back_to_sole_occupant() {
        let store = store();
        store.import_slot(5, b"only-key".to_vec(), None).unwrap();
        let active = store.active_key().unwrap();
        assert_eq!(active.index, 5);
    }

    #[test]
    fn active_key_is_ambiguous_with_multiple_unset_slots() {
        let store = store();
        store.import_slot(0, b"key-a".to_vec(), None).unwrap();
        store.import_slot(1, b"key-b".to_vec(), None).unwrap();
        assert!(matches!(store.active_key(), Err(AwmError::NullPointer)));

        store.set_active(1).unwrap();
        assert_eq!(store.active_key().unwrap().index, 1);
    }

    #[test]
    fn deleting_the_active_slot_falls_back_to_lowest_remaining_index() {
        let store = store();
        store.import_slot(2, b"key-a".to_vec(), None).unwrap();
        store.import_slot(5, b"key-b".to_vec(), None).unwrap();
        store.set_active(2).unwrap();

        let new_active = store.delete_slot(2).unwrap();
        assert_eq!(new_active, 5);
        assert_eq!(store.active_key().unwrap().index, 5);
    }

    #[test]
    fn deleting_the_active_slot_with_none_remaining_resets_to_zero() {
        let store = store();
        store.import_slot(2, b"key".to_vec(), None).unwrap();
        store.set_active(2).unwrap();

        let new_active = store.delete_slot(2).unwrap();
        assert_eq!(new_active, 0);
        assert!(matches!(store.active_key(), Err(AwmError::NullPointer)));
    }

    #[test]
    fn deleting_an_inactive_slot_leaves_active_unchanged() {
        let store = store();
        store.import_slot(1, b"key-a".to_vec(), None).unwrap();
        store.import_slot(2, b"key-b".to_vec(), None).unwrap();
        store.set_active(1).unwrap();

        let new_active = store.delete_slot(2).unwrap();
        assert_eq!(new_active, 1);
        assert_eq!(store.active_key().unwrap().index, 1);
    }

    #[test]
    fn set_active_on_empty_slot_fails() {
        let store = store();
        assert!(matches!(
            store.set_active(7),
            Err(AwmError::NullPointer)
        ));
    }

    #[test]
    fn summary_reflects_labels_and_active_flag() {
        let store = store();
        store
            .import_slot(0, b"key".to_vec(), Some("prod".into()))
            .unwrap();
        store.set_active(0).unwrap();
        let summary = store.summary().unwrap();
        let entry = &summary[0];
        assert_eq!(entry["label"], "prod");
        assert_eq!(entry["is_active"], true);
        assert_eq!(entry["has_key"], true);
        assert_eq!(entry["status_text"], "active");
        assert_eq!(entry["evidence_count"], 0);
        assert_eq!(entry["last_evidence_at"], serde_json::Value::Null);
        assert_eq!(entry["duplicate_of_slots"], serde_json::json!([]));
    }

    #[test]
    fn summary_has_one_entry_per_slot_even_when_empty() {
        let store = store();
        store.import_slot(0, b"key".to_vec(), None).unwrap();
        let summary = store.summary().unwrap();
        assert_eq!(summary.as_array().unwrap().len(), SLOT_COUNT);
        assert_eq!(summary[1]["has_key"], false);
        assert_eq!(summary[1]["status_text"], "empty");
        assert_eq!(summary[1]["key_id"], serde_json::Value::Null);
    }

    #[test]
    fn record_evidence_bumps_count_and_timestamp() {
        let store = store();
        store.import_slot(0, b"key".to_vec(), None).unwrap();
        store.record_evidence(0, 1_700_000_000).unwrap();
        store.record_evidence(0, 1_700_000_600).unwrap();

        let summary = store.summary().unwrap();
        assert_eq!(summary[0]["evidence_count"], 2);
        assert_eq!(summary[0]["last_evidence_at"], 1_700_000_600);
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let store = store();
        assert!(matches!(
            store.import_slot(32, b"key".to_vec(), None),
            Err(AwmError::InvalidMessageLength)
        ));
    }
}
