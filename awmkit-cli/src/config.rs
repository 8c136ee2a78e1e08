//! CLI-level configuration: where persisted state lives on disk.

use std::path::PathBuf;

/// Paths and defaults used by the CLI's subcommands.
#[derive(Clone, Debug)]
pub struct CliConfig {
    /// JSON file backing the key store, shared across CLI invocations.
    pub keys_path: PathBuf,
    /// JSON file backing the evidence ledger.
    pub evidence_path: PathBuf,
}

impl Default for CliConfig {
    fn default() -> Self {
        let base = std::env::var_os("AWMKIT_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                dirs_home().unwrap_or_else(|| PathBuf::from(".")).join(".awmkit")
            });
        Self {
            keys_path: base.join("keys.json"),
            evidence_path: base.join("evidence.json"),
        }
    }
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paths_live_under_the_same_base_dir() {
        let cfg = CliConfig::default();
        assert_eq!(cfg.keys_path.parent(), cfg.evidence_path.parent());
    }
}
