//! Command-line argument grammar for `awmkit`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "awmkit", version, about = "Audio watermark tag, key, embed/detect, and evidence tooling")]
pub struct Cli {
    /// Path to the JSON key store file. Defaults to `$AWMKIT_HOME/keys.json`.
    #[arg(long, global = true)]
    pub keys_path: Option<PathBuf>,

    /// Path to the JSON evidence ledger file. Defaults to
    /// `$AWMKIT_HOME/evidence.json`.
    #[arg(long, global = true)]
    pub evidence_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Tag algebra: create, verify, and suggest checksummed identity tags.
    Tag {
        #[command(subcommand)]
        action: TagAction,
    },
    /// Key store administration.
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },
    /// Embed a watermark into an audio file.
    Embed {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        /// Identity to embed; run through `tag new` if it is not already a
        /// valid 8-character tag.
        #[arg(long)]
        identity: String,
        /// Key slot to sign with. Defaults to the store's active key.
        #[arg(long)]
        key_slot: Option<u8>,
        #[arg(long, value_enum, default_value = "stereo")]
        layout: LayoutArg,
        /// Path to the `audiowmark` binary.
        #[arg(long, default_value = "audiowmark")]
        audiowmark_bin: String,
        /// Overrides the binary's default watermark strength.
        #[arg(long)]
        strength: Option<f32>,
    },
    /// Detect and verify a watermark in an audio file.
    Detect {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, value_enum, default_value = "stereo")]
        layout: LayoutArg,
        #[arg(long, default_value = "audiowmark")]
        audiowmark_bin: String,
        /// Fingerprint service base URL for clone checking. Omit to
        /// disable clone checking (always reports `unavailable`).
        #[arg(long)]
        fingerprint_url: Option<String>,
    },
    /// Evidence ledger review.
    Evidence {
        #[command(subcommand)]
        action: EvidenceAction,
    },
    /// Runs a Prometheus metrics exporter until interrupted.
    ServeMetrics {
        #[arg(long, default_value = "127.0.0.1:9898")]
        listen_addr: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum TagAction {
    /// Builds a checksummed tag from a 1-7 character identity.
    New { identity: String },
    /// Verifies that a tag's length, charset, and checksum are valid.
    Verify { tag: String },
    /// Recovers the identity prefix from a literal (non-wire) tag.
    Identity { tag: String },
    /// Derives a deterministic tag from an arbitrary username.
    Suggest { username: String },
}

#[derive(Subcommand, Debug)]
pub enum KeyAction {
    /// Lists all occupied slots.
    List,
    /// Generates a fresh random secret in an empty slot.
    Generate {
        slot: u8,
        #[arg(long)]
        label: Option<String>,
    },
    /// Removes whatever occupies a slot.
    Delete { slot: u8 },
    /// Marks a slot as the active signing key.
    SetActive { slot: u8 },
    /// Relabels an occupied slot.
    Label {
        slot: u8,
        #[arg(long)]
        label: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum EvidenceAction {
    /// Lists recorded detect evidence.
    List,
    /// Removes a single evidence record by id.
    Remove { id: String },
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum LayoutArg {
    Stereo,
    Surround51,
    Surround512,
    Surround71,
    Surround714,
    Surround916,
}

impl From<LayoutArg> for awmkit_core::orchestrator::ChannelLayout {
    fn from(value: LayoutArg) -> Self {
        use awmkit_core::orchestrator::ChannelLayout::*;
        match value {
            LayoutArg::Stereo => Stereo,
            LayoutArg::Surround51 => Surround51,
            LayoutArg::Surround512 => Surround512,
            LayoutArg::Surround71 => Surround71,
            LayoutArg::Surround714 => Surround714,
            LayoutArg::Surround916 => Surround916,
        }
    }
}
