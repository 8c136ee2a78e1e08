//! Pluggable persistence for evidence records.
//!
//! A relational evidence store (queryable by tag, time range, or verdict)
//! is out of scope for this crate; implementations of [`EvidenceBackend`]
//! beyond the in-memory reference live outside it.

use super::record::EvidenceRecord;
use crate::error::AwmError;

pub trait EvidenceBackend: Send + Sync {
    fn insert(&mut self, record: EvidenceRecord) -> Result<(), AwmError>;
    fn list(&self) -> Result<Vec<EvidenceRecord>, AwmError>;
    fn remove(&mut self, id: &str) -> Result<(), AwmError>;
}

#[derive(Default)]
pub struct InMemoryEvidenceBackend {
    records: Vec<EvidenceRecord>,
}

impl InMemoryEvidenceBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EvidenceBackend for InMemoryEvidenceBackend {
    fn insert(&mut self, record: EvidenceRecord) -> Result<(), AwmError> {
        self.records.push(record);
        Ok(())
    }

    fn list(&self) -> Result<Vec<EvidenceRecord>, AwmError> {
        Ok(self.records.clone())
    }

    fn remove(&mut self, id: &str) -> Result<(), AwmError> {
        self.records.retain(|r| r.id != id);
        Ok(())
    }
}
