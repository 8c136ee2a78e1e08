//! A simple JSON-file-backed [`KeyStoreBackend`], external to `awmkit-core`
//! the way the spec intends platform-specific secret stores to be: the
//! core crate only defines the trait and an in-memory reference
//! implementation.
//!
//! This backend stores secrets as plain hex in a JSON file. It exists so
//! the CLI's `key` subcommands persist across invocations; it is not an
//! at-rest-encrypted store and should not be pointed at a multi-user path.

use std::fs;
use std::path::PathBuf;

use awmkit_core::error::AwmError;
use awmkit_core::keystore::backend::KeyStoreBackend;
use awmkit_core::keystore::slot::KeySlot;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Default)]
struct FileContents {
    slots: Vec<FileSlot>,
    active: Option<u8>,
}

#[derive(Serialize, Deserialize)]
struct FileSlot {
    index: u8,
    secret_hex: String,
    label: Option<String>,
    #[serde(default)]
    evidence_count: u64,
    #[serde(default)]
    last_evidence_at: Option<u64>,
}

pub struct FileKeyStoreBackend {
    path: PathBuf,
}

impl FileKeyStoreBackend {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn read(&self) -> Result<FileContents, AwmError> {
        if !self.path.exists() {
            return Ok(FileContents::default());
        }
        let raw = fs::read_to_string(&self.path)?;
        serde_json::from_str(&raw).map_err(AwmError::from)
    }

    fn write(&self, contents: &FileContents) -> Result<(), AwmError> {
        let raw = serde_json::to_string_pretty(contents)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl KeyStoreBackend for FileKeyStoreBackend {
    fn load_all(&self) -> Result<Vec<KeySlot>, AwmError> {
        let contents = self.read()?;
        contents
            .slots
            .into_iter()
            .map(|s| {
                let secret = hex::decode(&s.secret_hex)
                    .map_err(|e| AwmError::Serde(format!("bad secret hex: {e}")))?;
                let mut slot = KeySlot::new(s.index, secret, s.label);
                slot.evidence_count = s.evidence_count;
                slot.last_evidence_at = s.last_evidence_at;
                Ok(slot)
            })
            .collect()
    }

    fn save_slot(&mut self, slot: KeySlot) -> Result<(), AwmError> {
        let mut contents = self.read()?;
        contents.slots.retain(|s| s.index != slot.index);
        contents.slots.push(FileSlot {
            index: slot.index,
            secret_hex: hex::encode(&slot.secret),
            label: slot.label.clone(),
            evidence_count: slot.evidence_count,
            last_evidence_at: slot.last_evidence_at,
        });
        self.write(&contents)
    }

    fn delete_slot(&mut self, index: u8) -> Result<(), AwmError> {
        let mut contents = self.read()?;
        contents.slots.retain(|s| s.index != index);
        if contents.active == Some(index) {
            contents.active = None;
        }
        self.write(&contents)
    }

    fn load_active(&self) -> Result<Option<u8>, AwmError> {
        Ok(self.read()?.active)
    }

    fn save_active(&mut self, index: u8) -> Result<(), AwmError> {
        let mut contents = self.read()?;
        contents.active = Some(index);
        self.write(&contents)
    }

    fn backend_label(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn slots_survive_a_round_trip_through_disk() {
        let file = NamedTempFile::new().unwrap();
        let mut backend = FileKeyStoreBackend::new(file.path().to_path_buf());

        backend
            .save_slot(KeySlot::new(0, b"secret-bytes".to_vec(), Some("prod".into())))
            .unwrap();
        backend.save_active(0).unwrap();

        let reloaded = FileKeyStoreBackend::new(file.path().to_path_buf());
        let slots = reloaded.load_all().unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].secret, b"secret-bytes");
        assert_eq!(reloaded.load_active().unwrap(), Some(0));
    }

    #[test]
    fn missing_file_is_treated_as_empty() {
        let backend = FileKeyStoreBackend::new(PathBuf::from("/nonexistent/path/keys.json"));
        assert_eq!(backend.load_all().unwrap().len(), 0);
    }
}
