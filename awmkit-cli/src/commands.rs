//! Subcommand handlers: thin glue between the CLI grammar and `awmkit-core`.

use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use awmkit_core::codec::WireMessage;
use awmkit_core::error::AwmError;
use awmkit_core::evidence::{
    DisabledFingerprintService, EvidenceBackend, FingerprintService, HttpFingerprintService,
};
use awmkit_core::keystore::KeyStore;
use awmkit_core::orchestrator::{
    ChannelLayout, OrchestratorConfig, ProcessAudiowmarkRunner, WatermarkOrchestrator,
};
use awmkit_core::tag::{tag_identity, tag_new, tag_suggest, tag_verify};

use crate::cli::{EvidenceAction, KeyAction, TagAction};
use crate::evidence_backend::FileEvidenceBackend;
use crate::file_backend::FileKeyStoreBackend;

const WIRE_VERSION: u8 = 2;

pub fn run_tag(action: TagAction) -> Result<(), AwmError> {
    match action {
        TagAction::New { identity } => {
            let tag = tag_new(&identity)?;
            println!("{tag}");
        }
        TagAction::Verify { tag } => {
            if tag_verify(&tag) {
                println!("valid");
            } else {
                println!("invalid");
                std::process::exit(1);
            }
        }
        TagAction::Identity { tag } => {
            let identity = tag_identity(&tag)?;
            println!("{identity}");
        }
        TagAction::Suggest { username } => {
            println!("{}", tag_suggest(&username));
        }
    }
    Ok(())
}

fn key_store(keys_path: PathBuf) -> KeyStore<FileKeyStoreBackend> {
    KeyStore::new(FileKeyStoreBackend::new(keys_path))
}

pub fn run_key(action: KeyAction, keys_path: PathBuf) -> Result<(), AwmError> {
    let store = key_store(keys_path);
    match action {
        KeyAction::List => {
            let summary = store.summary()?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        KeyAction::Generate { slot, label } => {
            let created = store.generate_and_save_slot(slot, label)?;
            println!("generated slot {} ({})", created.index, created.key_id);
        }
        KeyAction::Delete { slot } => {
            let new_active = store.delete_slot(slot)?;
            println!("deleted slot {slot}; active slot is now {new_active}");
        }
        KeyAction::SetActive { slot } => {
            store.set_active(slot)?;
            println!("slot {slot} is now active");
        }
        KeyAction::Label { slot, label } => {
            store.label_slot(slot, label)?;
            println!("relabeled slot {slot}");
        }
    }
    Ok(())
}

fn resolve_tag(identity_or_tag: &str) -> Result<String, AwmError> {
    if tag_verify(identity_or_tag) {
        Ok(identity_or_tag.to_string())
    } else {
        tag_new(identity_or_tag)
    }
}

fn now_minutes() -> u32 {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    (secs / 60) as u32
}

/// Builds an [`OrchestratorConfig`] from the binary path/strength the CLI
/// was invoked with, layering them over the default clone-check thresholds.
fn orchestrator_config(audiowmark_bin: String, strength: Option<f32>) -> OrchestratorConfig {
    OrchestratorConfig {
        audiowmark_bin,
        default_strength: strength,
        ..OrchestratorConfig::default()
    }
}

#[allow(clippy::too_many_arguments)]
pub fn run_embed(
    input: PathBuf,
    output: PathBuf,
    identity: String,
    key_slot: Option<u8>,
    layout: ChannelLayout,
    audiowmark_bin: String,
    strength: Option<f32>,
    keys_path: PathBuf,
) -> Result<(), AwmError> {
    let store = key_store(keys_path);
    let slot = match key_slot {
        Some(index) => store.slot(index)?,
        None => store.active_key()?,
    };

    let tag = resolve_tag(&identity)?;
    let message = WireMessage {
        version: WIRE_VERSION,
        key_slot: slot.index,
        timestamp_minutes: now_minutes(),
        tag,
    };

    let config = orchestrator_config(audiowmark_bin, strength);
    let runner = ProcessAudiowmarkRunner::new(config.audiowmark_bin.clone());
    let orchestrator = WatermarkOrchestrator::new(runner, DisabledFingerprintService, config);
    orchestrator.embed(&input, &output, layout, &message, &slot.secret, None)?;
    println!("embedded tag {} into {}", message.tag, output.display());
    Ok(())
}

pub fn run_detect(
    input: PathBuf,
    layout: ChannelLayout,
    audiowmark_bin: String,
    fingerprint_url: Option<String>,
    keys_path: PathBuf,
    evidence_path: PathBuf,
) -> Result<(), AwmError> {
    let store = key_store(keys_path);
    let slot = store.active_key()?;

    let config = orchestrator_config(audiowmark_bin, None);
    let runner = ProcessAudiowmarkRunner::new(config.audiowmark_bin.clone());

    let (message, record) = match fingerprint_url {
        Some(url) => {
            let fingerprint = HttpFingerprintService::new(url, Duration::from_secs(2))?;
            let orchestrator = WatermarkOrchestrator::new(runner, fingerprint, config);
            orchestrator.detect(&input, layout, &slot.secret)?
        }
        None => {
            let orchestrator =
                WatermarkOrchestrator::new(runner, DisabledFingerprintService, config);
            orchestrator.detect(&input, layout, &slot.secret)?
        }
    };

    store.record_evidence(message.key_slot, record.created_at_unix)?;

    let mut evidence = FileEvidenceBackend::new(evidence_path);
    evidence.insert(record.clone())?;

    println!("{}", serde_json::to_string_pretty(&record.to_json())?);
    println!("identity: {}", message.tag);
    Ok(())
}

pub fn run_evidence(action: EvidenceAction, evidence_path: PathBuf) -> Result<(), AwmError> {
    let mut backend = FileEvidenceBackend::new(evidence_path);
    match action {
        EvidenceAction::List => {
            let records = backend.list()?;
            let json: Vec<_> = records.iter().map(|r| r.to_json()).collect();
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        EvidenceAction::Remove { id } => {
            backend.remove(&id)?;
            println!("removed {id}");
        }
    }
    Ok(())
}

/// Round-trip a wire message through the codec without a real key store,
/// used only by tests in this module to sanity-check the glue above.
#[cfg(test)]
fn roundtrip(message: &WireMessage, key: &[u8]) -> WireMessage {
    use awmkit_core::codec::{decode, encode};
    let payload = encode(message, key).unwrap();
    decode(&payload, key).unwrap()
}
