//! A single evidence record: what was detected, from which file, and what
//! the clone check concluded about it.

use super::clone_check::CloneVerdict;
use serde::{Deserialize, Serialize};

/// One row of the evidence ledger, produced at the end of an embed or
/// detect operation and persisted via an [`super::backend::EvidenceBackend`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvidenceRecord {
    pub id: String,
    pub file_path: String,
    pub raw_message: [u8; 16],
    pub identity: String,
    pub key_slot: u8,
    pub created_at_unix: u64,
    pub bit_errors: u32,
    pub detect_score: f64,
    pub snr_db: Option<f64>,
    pub clone_verdict: CloneVerdict,
}

impl EvidenceRecord {
    /// Renders this record as the evidence listing JSON object described
    /// by the external interface: `{id, file_path, identity, key_slot,
    /// created_at, snr_db|null}`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "file_path": self.file_path,
            "identity": self.identity,
            "key_slot": self.key_slot,
            "created_at": self.created_at_unix,
            "snr_db": self.snr_db,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EvidenceRecord {
        EvidenceRecord {
            id: "ev-1".into(),
            file_path: "/tmp/clip.wav".into(),
            raw_message: [0u8; 16],
            identity: "SAKUZY".into(),
            key_slot: 0,
            created_at_unix: 1_700_000_000,
            bit_errors: 0,
            detect_score: 0.98,
            snr_db: Some(12.5),
            clone_verdict: CloneVerdict::Exact,
        }
    }

    #[test]
    fn to_json_matches_the_evidence_listing_shape() {
        let record = sample();
        let json = record.to_json();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "ev-1",
                "file_path": "/tmp/clip.wav",
                "identity": "SAKUZY",
                "key_slot": 0,
                "created_at": 1_700_000_000u64,
                "snr_db": 12.5,
            })
        );
    }

    #[test]
    fn missing_snr_renders_as_null() {
        let mut record = sample();
        record.snr_db = None;
        assert_eq!(record.to_json()["snr_db"], serde_json::Value::Null);
    }
}
