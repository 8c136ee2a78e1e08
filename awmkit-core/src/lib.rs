//! Audio watermark kit core library.
//!
//! This crate provides the building blocks for embedding, detecting, and
//! auditing HMAC-authenticated watermark tags in audio:
//!
//! - the tag algebra (`tag`): checksummed 8-character identity encodings,
//! - the wire message codec (`codec`): authenticated 16-byte messages,
//! - a 32-slot key store (`keystore`),
//! - the evidence recorder and clone-check classifier (`evidence`),
//! - the multichannel watermark orchestrator (`orchestrator`),
//! - Prometheus-based metrics (`metrics`),
//! - a unified error type (`error`),
//! - and top-level configuration (`config`).
//!
//! Higher-level binaries (see `awmkit-cli`) compose these pieces into a
//! command-line tool.

pub mod codec;
pub mod config;
pub mod error;
pub mod evidence;
pub mod keystore;
pub mod metrics;
pub mod orchestrator;
pub mod tag;

// Re-export top-level configuration types.
pub use config::{AwmConfig, FingerprintClientConfig, KeyStoreConfig, MetricsConfig};

// Re-export the unified error type.
pub use error::AwmError;

// Re-export the tag algebra's public operations.
pub use tag::{identity_from_packed_tag, tag_identity, tag_new, tag_suggest, tag_verify};

// Re-export the wire message codec.
pub use codec::{MESSAGE_LEN, WireMessage, decode, decode_unverified, encode, verify};

// Re-export the key store.
pub use keystore::{InMemoryKeyStoreBackend, KeySlot, KeyStore, KeyStoreBackend};

// Re-export evidence recording and clone-check types.
pub use evidence::{
    CloneCheckConfig, CloneVerdict, DisabledFingerprintService, EvidenceBackend, EvidenceRecord,
    FingerprintService, HttpFingerprintService, InMemoryEvidenceBackend,
};

// Re-export the orchestrator.
pub use orchestrator::{
    AudiowmarkRunner, ChannelLayout, OrchestratorConfig, ProcessAudiowmarkRunner, ProgressBus,
    WatermarkOrchestrator,
};

// Re-export metrics registry.
pub use metrics::{AwmMetrics, MetricsRegistry, run_prometheus_http_server};

/// Type alias for the default key store backend (process-local, not
/// persisted across restarts).
pub type DefaultKeyStoreBackend = InMemoryKeyStoreBackend;

/// Type alias for the default watermark orchestrator stack: the real
/// `audiowmark` subprocess runner with clone checking disabled.
pub type DefaultOrchestrator =
    WatermarkOrchestrator<ProcessAudiowmarkRunner, DisabledFingerprintService>;
