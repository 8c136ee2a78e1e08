//! Top-level configuration for the watermark kit.
//!
//! This module aggregates configuration for:
//!
//! - the key store (slot count is fixed, but this leaves room for
//!   backend-specific settings),
//! - clone-check thresholds (`evidence::CloneCheckConfig`),
//! - the watermark orchestrator (external binary path, clone-check config),
//! - the metrics exporter (enable flag + listen address).
//!
//! The goal is a single `AwmConfig` that `awmkit-cli` can construct from
//! defaults, a config file, or environment variables as needed.

use std::net::SocketAddr;
use std::time::Duration;

use crate::evidence::CloneCheckConfig;
use crate::orchestrator::OrchestratorConfig;

/// Configuration for the key store.
#[derive(Clone, Debug, Default)]
pub struct KeyStoreConfig {
    /// Optional path to a file-backed store; `None` uses the in-memory
    /// backend (keys do not survive process exit).
    pub persistence_path: Option<String>,
}

/// Configuration for the acoustic fingerprint client used by clone checks.
#[derive(Clone, Debug)]
pub struct FingerprintClientConfig {
    /// Base URL of the fingerprint service. `None` disables clone
    /// checking entirely (always reports `Unavailable`).
    pub base_url: Option<String>,
    pub timeout: Duration,
}

impl Default for FingerprintClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(2),
        }
    }
}

/// Configuration for the Prometheus metrics exporter.
#[derive(Clone, Debug)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub listen_addr: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        let addr: SocketAddr = "127.0.0.1:9898"
            .parse()
            .expect("hard-coded metrics listen address should parse");
        Self {
            enabled: true,
            listen_addr: addr,
        }
    }
}

/// Top-level configuration for the watermark kit.
#[derive(Clone, Debug, Default)]
pub struct AwmConfig {
    pub key_store: KeyStoreConfig,
    pub clone_check: CloneCheckConfig,
    pub fingerprint_client: FingerprintClientConfig,
    pub metrics: MetricsConfig,
}

impl AwmConfig {
    /// Builds the orchestrator configuration implied by this top-level
    /// config (currently just the clone-check thresholds).
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            clone_check: self.clone_check,
            ..OrchestratorConfig::default()
        }
    }
}
