//! The external `audiowmark`-like binary contract, behind a trait so the
//! orchestrator can be tested without spawning a real process.

use std::path::Path;
use std::process::Command;

use super::layout::ChannelPair;
use crate::error::AwmError;

/// Outcome of a single-pair detect invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectOutcome {
    /// Number of bit errors between the decoded payload and the closest
    /// valid codeword, as reported by the external binary.
    pub bit_errors: u32,
    /// The external binary's own confidence score for this detection.
    pub detect_score: f64,
    /// Raw 16-byte decoded wire message, if the binary found one at all.
    pub payload: Option<[u8; 16]>,
}

/// The subprocess contract the orchestrator drives for each channel pair.
pub trait AudiowmarkRunner: Send + Sync {
    /// Embeds `payload` into the stereo WAV at `input_path`, writing the
    /// watermarked result to `output_path`. `strength` overrides the
    /// binary's default watermark strength when set.
    fn embed(
        &self,
        input_path: &Path,
        output_path: &Path,
        payload: &[u8; 16],
        strength: Option<f32>,
    ) -> Result<(), AwmError>;

    /// Attempts to detect and decode a watermark from the channel pair
    /// `pair` (left/right 0-indexed channel positions) of the audio at
    /// `input_path`.
    fn detect(&self, input_path: &Path, pair: ChannelPair) -> Result<DetectOutcome, AwmError>;
}

/// Drives the real `audiowmark` binary via `std::process::Command`.
pub struct ProcessAudiowmarkRunner {
    binary_path: String,
}

impl ProcessAudiowmarkRunner {
    /// `binary_path` is resolved via `PATH` if it contains no path
    /// separator, or used as-is otherwise.
    pub fn new(binary_path: impl Into<String>) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }
}

impl AudiowmarkRunner for ProcessAudiowmarkRunner {
    fn embed(
        &self,
        input_path: &Path,
        output_path: &Path,
        payload: &[u8; 16],
        strength: Option<f32>,
    ) -> Result<(), AwmError> {
        let payload_hex = hex::encode(payload);
        let mut cmd = Command::new(&self.binary_path);
        cmd.arg("add").arg(input_path).arg(output_path).arg(&payload_hex);
        if let Some(strength) = strength {
            cmd.arg("--strength").arg(strength.to_string());
        }
        let output = cmd.output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AwmError::AudiowmarkNotFound
            } else {
                AwmError::AudiowmarkExec(e.to_string())
            }
        })?;

        if !output.status.success() {
            return Err(AwmError::AudiowmarkExec(
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }
        Ok(())
    }

    fn detect(&self, input_path: &Path, pair: ChannelPair) -> Result<DetectOutcome, AwmError> {
        let output = Command::new(&self.binary_path)
            .arg("get")
            .arg(input_path)
            .arg("--channels")
            .arg(format!("{},{}", pair.left, pair.right))
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    AwmError::AudiowmarkNotFound
                } else {
                    AwmError::AudiowmarkExec(e.to_string())
                }
            })?;

        if !output.status.success() {
            return Err(AwmError::AudiowmarkExec(
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }

        parse_detect_output(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parses `audiowmark get`'s line-oriented stdout, e.g.:
/// `pattern 0 <32-hex-char-payload> 3 0.87`
fn parse_detect_output(stdout: &str) -> Result<DetectOutcome, AwmError> {
    let line = stdout
        .lines()
        .find(|l| l.starts_with("pattern"))
        .ok_or(AwmError::NoWatermarkFound)?;

    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 5 {
        return Err(AwmError::AudiowmarkExec(format!(
            "malformed detect line: {line}"
        )));
    }

    let payload_hex = fields[2];
    let payload_bytes =
        hex::decode(payload_hex).map_err(|e| AwmError::AudiowmarkExec(e.to_string()))?;
    let payload: Option<[u8; 16]> = payload_bytes.try_into().ok();

    let bit_errors: u32 = fields[3]
        .parse()
        .map_err(|_| AwmError::AudiowmarkExec(format!("bad bit_errors field: {}", fields[3])))?;
    let detect_score: f64 = fields[4]
        .parse()
        .map_err(|_| AwmError::AudiowmarkExec(format!("bad detect_score field: {}", fields[4])))?;

    Ok(DetectOutcome {
        bit_errors,
        detect_score,
        payload,
    })
}
