//! Acoustic fingerprint lookups, behind a trait so the HTTP client is
//! swappable for tests and for deployments with no fingerprint service.

use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use super::clone_check::FingerprintMatch;
use crate::error::AwmError;

/// Looks up the closest known fingerprint match for a piece of audio
/// against an external index.
pub trait FingerprintService: Send + Sync {
    /// Returns the closest match (a distance score plus matched duration
    /// in seconds) for the audio at `path`, or `None` if the index has no
    /// plausible candidate at all.
    fn lookup(&self, path: &Path) -> Result<Option<FingerprintMatch>, AwmError>;
}

/// Always reports no fingerprint match available. Used when clone
/// checking is disabled in [`crate::config::CloneCheckConfig`]'s
/// `OrchestratorConfig` wiring, or in tests that don't exercise it.
pub struct DisabledFingerprintService;

impl FingerprintService for DisabledFingerprintService {
    fn lookup(&self, _path: &Path) -> Result<Option<FingerprintMatch>, AwmError> {
        Ok(None)
    }
}

#[derive(Debug, Serialize)]
struct FingerprintRequest<'a> {
    path: &'a str,
}

#[derive(Debug, Deserialize)]
struct FingerprintResponse {
    score: Option<f64>,
    match_seconds: Option<f64>,
}

/// HTTP-based fingerprint client, mirroring the same request/response
/// shape as an external similarity-search service.
///
/// Thread-safe; uses the blocking `reqwest` client since the orchestrator
/// runs its phase state machine on a dedicated worker thread, not inside
/// an async runtime.
pub struct HttpFingerprintService {
    base_url: String,
    client: Client,
}

impl HttpFingerprintService {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AwmError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AwmError::Io(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl FingerprintService for HttpFingerprintService {
    fn lookup(&self, path: &Path) -> Result<Option<FingerprintMatch>, AwmError> {
        let url = self.endpoint("/fingerprint/lookup");
        let path_str = path.to_string_lossy();
        let req_body = FingerprintRequest { path: &path_str };

        let resp = self
            .client
            .post(&url)
            .json(&req_body)
            .send()
            .map_err(|e| AwmError::Io(format!("HTTP POST {url} failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AwmError::Io(format!(
                "fingerprint service returned HTTP status {status}"
            )));
        }

        let body = resp
            .json::<FingerprintResponse>()
            .map_err(|e| AwmError::Io(format!("failed to parse fingerprint response: {e}")))?;
        Ok(match (body.score, body.match_seconds) {
            (Some(score), Some(match_seconds)) => Some(FingerprintMatch { score, match_seconds }),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_service_always_returns_none() {
        let svc = DisabledFingerprintService;
        assert_eq!(svc.lookup(Path::new("/tmp/x.wav")).unwrap(), None);
    }

    #[test]
    fn fingerprint_response_can_be_deserialized() {
        let json = r#"{ "score": 0.03, "match_seconds": 12.5 }"#;
        let resp: FingerprintResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.score, Some(0.03));
        assert_eq!(resp.match_seconds, Some(12.5));
    }

    #[test]
    fn fingerprint_response_with_no_match_deserializes_to_none() {
        let json = r#"{ "score": null, "match_seconds": null }"#;
        let resp: FingerprintResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.score, None);
        assert_eq!(resp.match_seconds, None);
    }
}
