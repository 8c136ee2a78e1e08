//! Unified error type for the AWM core.
//!
//! A single enum carries every failure mode described by the component
//! specs (tag algebra, codec, key store, evidence, orchestrator). Each
//! variant maps to a stable signed error code via [`AwmError::code`] so a
//! future FFI boundary can surface the same taxonomy without re-deriving it.

use std::fmt;

/// Unified error type returned by every public operation in this crate.
#[derive(Debug)]
pub enum AwmError {
    /// Tag failed validation (bad length, character set, or checksum).
    InvalidTag,
    /// A wire message was not exactly 16 bytes.
    InvalidMessageLength,
    /// Recomputed HMAC did not match the message's truncated tail.
    HmacMismatch,
    /// A required pointer/handle was absent (reserved for the FFI boundary;
    /// surfaced here when a caller passes an empty required buffer).
    NullPointer,
    /// Input bytes were not valid UTF-8 where a string was required.
    InvalidUtf8,
    /// A checksum computed outside the tag algebra did not match.
    ChecksumMismatch,
    /// The external `audiowmark` binary could not be found on `PATH`.
    AudiowmarkNotFound,
    /// The external binary exited non-zero or produced unparseable output.
    AudiowmarkExec(String),
    /// No channel pair yielded a verified detection.
    NoWatermarkFound,
    /// `generate_and_save_slot` targeted a slot that already holds a key.
    KeyAlreadyExists,
    /// A requested output format/container is not supported.
    InvalidOutputFormat,
    /// Multichannel layout could not be resolved from container metadata.
    AdmUnsupported,
    /// A lossy container could not preserve the required passthrough data.
    AdmPreserveFailed,
    /// The input PCM format is not one the orchestrator can route.
    AdmPcmFormatUnsupported,
    /// Wraps an I/O failure (process spawn, file access) with context.
    Io(String),
    /// Wraps a JSON (de)serialization failure.
    Serde(String),
}

impl AwmError {
    /// Stable signed error code, matching the external-interface table.
    pub fn code(&self) -> i32 {
        match self {
            AwmError::InvalidTag => -1,
            AwmError::InvalidMessageLength => -2,
            AwmError::HmacMismatch => -3,
            AwmError::NullPointer => -4,
            AwmError::InvalidUtf8 => -5,
            AwmError::ChecksumMismatch => -6,
            AwmError::AudiowmarkNotFound => -7,
            AwmError::AudiowmarkExec(_) => -8,
            AwmError::NoWatermarkFound => -9,
            AwmError::KeyAlreadyExists => -10,
            AwmError::InvalidOutputFormat => -11,
            AwmError::AdmUnsupported => -12,
            AwmError::AdmPreserveFailed => -13,
            AwmError::AdmPcmFormatUnsupported => -14,
            // I/O and serde failures don't have a dedicated code in the
            // external table; they surface through AudiowmarkExec's slot
            // when raised from orchestrator I/O, otherwise as a generic
            // operational failure.
            AwmError::Io(_) => -8,
            AwmError::Serde(_) => -8,
        }
    }

    /// `true` for validation errors (§7): local, no side effects, never retried.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AwmError::InvalidTag
                | AwmError::InvalidMessageLength
                | AwmError::ChecksumMismatch
                | AwmError::InvalidUtf8
                | AwmError::NullPointer
                | AwmError::KeyAlreadyExists
                | AwmError::InvalidOutputFormat
        )
    }
}

impl fmt::Display for AwmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AwmError::InvalidTag => write!(f, "invalid tag"),
            AwmError::InvalidMessageLength => write!(f, "message length must be 16 bytes"),
            AwmError::HmacMismatch => write!(f, "HMAC verification failed"),
            AwmError::NullPointer => write!(f, "required value was null/empty"),
            AwmError::InvalidUtf8 => write!(f, "input was not valid UTF-8"),
            AwmError::ChecksumMismatch => write!(f, "checksum mismatch"),
            AwmError::AudiowmarkNotFound => write!(f, "audiowmark binary not found"),
            AwmError::AudiowmarkExec(msg) => write!(f, "audiowmark execution failed: {msg}"),
            AwmError::NoWatermarkFound => write!(f, "no watermark found"),
            AwmError::KeyAlreadyExists => write!(f, "key slot already populated"),
            AwmError::InvalidOutputFormat => write!(f, "invalid output format"),
            AwmError::AdmUnsupported => write!(f, "unsupported multichannel container"),
            AwmError::AdmPreserveFailed => write!(f, "could not preserve lossy passthrough data"),
            AwmError::AdmPcmFormatUnsupported => write!(f, "unsupported PCM format"),
            AwmError::Io(msg) => write!(f, "I/O error: {msg}"),
            AwmError::Serde(msg) => write!(f, "serialization error: {msg}"),
        }
    }
}

impl std::error::Error for AwmError {}

impl From<std::io::Error> for AwmError {
    fn from(e: std::io::Error) -> Self {
        AwmError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for AwmError {
    fn from(e: serde_json::Error) -> Self {
        AwmError::Serde(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_external_interface_table() {
        assert_eq!(AwmError::InvalidTag.code(), -1);
        assert_eq!(AwmError::InvalidMessageLength.code(), -2);
        assert_eq!(AwmError::HmacMismatch.code(), -3);
        assert_eq!(AwmError::NullPointer.code(), -4);
        assert_eq!(AwmError::InvalidUtf8.code(), -5);
        assert_eq!(AwmError::ChecksumMismatch.code(), -6);
        assert_eq!(AwmError::AudiowmarkNotFound.code(), -7);
        assert_eq!(AwmError::AudiowmarkExec("x".into()).code(), -8);
        assert_eq!(AwmError::NoWatermarkFound.code(), -9);
        assert_eq!(AwmError::KeyAlreadyExists.code(), -10);
        assert_eq!(AwmError::InvalidOutputFormat.code(), -11);
        assert_eq!(AwmError::AdmUnsupported.code(), -12);
        assert_eq!(AwmError::AdmPreserveFailed.code(), -13);
        assert_eq!(AwmError::AdmPcmFormatUnsupported.code(), -14);
    }

    #[test]
    fn validation_errors_are_classified_correctly() {
        assert!(AwmError::InvalidTag.is_validation());
        assert!(AwmError::KeyAlreadyExists.is_validation());
        assert!(!AwmError::HmacMismatch.is_validation());
        assert!(!AwmError::NoWatermarkFound.is_validation());
    }
}
