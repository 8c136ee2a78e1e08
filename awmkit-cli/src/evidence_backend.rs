//! A JSON-file-backed [`EvidenceBackend`], external to `awmkit-core` for the
//! same reason [`crate::file_backend::FileKeyStoreBackend`] is: the core
//! crate ships only the trait and an in-memory reference implementation.

use std::fs;
use std::path::PathBuf;

use awmkit_core::error::AwmError;
use awmkit_core::evidence::{EvidenceBackend, EvidenceRecord};

pub struct FileEvidenceBackend {
    path: PathBuf,
}

impl FileEvidenceBackend {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn read(&self) -> Result<Vec<EvidenceRecord>, AwmError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        serde_json::from_str(&raw).map_err(AwmError::from)
    }

    fn write(&self, records: &[EvidenceRecord]) -> Result<(), AwmError> {
        let raw = serde_json::to_string_pretty(records)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl EvidenceBackend for FileEvidenceBackend {
    fn insert(&mut self, record: EvidenceRecord) -> Result<(), AwmError> {
        let mut records = self.read()?;
        records.push(record);
        self.write(&records)
    }

    fn list(&self) -> Result<Vec<EvidenceRecord>, AwmError> {
        self.read()
    }

    fn remove(&mut self, id: &str) -> Result<(), AwmError> {
        let mut records = self.read()?;
        records.retain(|r| r.id != id);
        self.write(&records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use awmkit_core::evidence::CloneVerdict;
    use tempfile::NamedTempFile;

    fn record(id: &str) -> EvidenceRecord {
        EvidenceRecord {
            id: id.to_string(),
            file_path: "/tmp/clip.wav".into(),
            raw_message: [0u8; 16],
            identity: "SAKUZY".into(),
            key_slot: 0,
            created_at_unix: 0,
            bit_errors: 0,
            detect_score: 1.0,
            snr_db: Some(10.0),
            clone_verdict: CloneVerdict::Unavailable,
        }
    }

    #[test]
    fn records_survive_a_round_trip_through_disk() {
        let file = NamedTempFile::new().unwrap();
        let mut backend = FileEvidenceBackend::new(file.path().to_path_buf());
        backend.insert(record("ev-1")).unwrap();

        let reloaded = FileEvidenceBackend::new(file.path().to_path_buf());
        let records = reloaded.list().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "ev-1");
    }

    #[test]
    fn remove_drops_only_the_matching_id() {
        let file = NamedTempFile::new().unwrap();
        let mut backend = FileEvidenceBackend::new(file.path().to_path_buf());
        backend.insert(record("a")).unwrap();
        backend.insert(record("b")).unwrap();
        backend.remove("a").unwrap();
        let remaining = backend.list().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "b");
    }
}
