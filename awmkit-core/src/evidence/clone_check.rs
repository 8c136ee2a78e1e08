//! Acoustic-fingerprint-based clone detection: classifying a detected
//! tag's host audio against a fingerprint-distance threshold ladder.

use serde::{Deserialize, Serialize};

/// A single fingerprint lookup result: a distance `score` (lower is
/// better, 0.0 means identical) and the length of matched audio in
/// seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FingerprintMatch {
    pub score: f64,
    pub match_seconds: f64,
}

/// Runtime-tunable thresholds for [`classify`].
///
/// Ordered from strictest to loosest: `tau_exact <= tau_likely <=
/// tau_suspect`. `s_min` is a duration floor, not a score: a match below
/// `tau_likely` that doesn't also cover at least `s_min` seconds of audio
/// can only ever be `Suspect`, never `Exact` or `Likely`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CloneCheckConfig {
    pub tau_exact: f64,
    pub tau_likely: f64,
    pub tau_suspect: f64,
    pub s_min: f64,
}

impl Default for CloneCheckConfig {
    fn default() -> Self {
        Self {
            tau_exact: 0.02,
            tau_likely: 0.10,
            tau_suspect: 0.30,
            s_min: 5.0,
        }
    }
}

/// Classification of a detected watermark's host audio against the
/// fingerprint index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloneVerdict {
    /// Distance at or below `tau_exact` over at least `s_min` seconds:
    /// almost certainly the same recording.
    Exact,
    /// Distance in `(tau_exact, tau_likely]` over at least `s_min`
    /// seconds: probably a transcode or light edit of the same recording.
    Likely,
    /// Distance at or below `tau_suspect`, but either the matched
    /// duration fell short of `s_min` or the distance missed `tau_likely`:
    /// too close to be coincidence, not confidently the same source.
    Suspect,
    /// No fingerprint service was available, it found no candidate, or
    /// the distance exceeded `tau_suspect`.
    Unavailable,
}

/// Classifies a fingerprint lookup (`None` if no candidate was found, or
/// the service was disabled/unreachable) against `config`.
pub fn classify(fingerprint: Option<FingerprintMatch>, config: &CloneCheckConfig) -> CloneVerdict {
    let Some(m) = fingerprint else {
        return CloneVerdict::Unavailable;
    };
    let long_enough = m.match_seconds >= config.s_min;
    if m.score <= config.tau_exact && long_enough {
        CloneVerdict::Exact
    } else if m.score <= config.tau_likely && long_enough {
        CloneVerdict::Likely
    } else if m.score <= config.tau_suspect {
        CloneVerdict::Suspect
    } else {
        CloneVerdict::Unavailable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(score: f64, match_seconds: f64) -> Option<FingerprintMatch> {
        Some(FingerprintMatch { score, match_seconds })
    }

    #[test]
    fn none_fingerprint_is_unavailable() {
        assert_eq!(classify(None, &CloneCheckConfig::default()), CloneVerdict::Unavailable);
    }

    #[test]
    fn exact_requires_both_low_score_and_long_match() {
        let cfg = CloneCheckConfig::default();
        assert_eq!(classify(m(0.01, 10.0), &cfg), CloneVerdict::Exact);
        assert_eq!(classify(m(0.01, 1.0), &cfg), CloneVerdict::Suspect);
    }

    #[test]
    fn likely_band_requires_long_match_too() {
        let cfg = CloneCheckConfig::default();
        assert_eq!(classify(m(0.08, 10.0), &cfg), CloneVerdict::Likely);
        assert_eq!(classify(m(0.08, 1.0), &cfg), CloneVerdict::Suspect);
    }

    #[test]
    fn suspect_covers_a_short_but_close_match() {
        let cfg = CloneCheckConfig::default();
        assert_eq!(classify(m(0.25, 0.5), &cfg), CloneVerdict::Suspect);
    }

    #[test]
    fn score_past_suspect_threshold_is_unavailable() {
        let cfg = CloneCheckConfig::default();
        assert_eq!(classify(m(0.9, 30.0), &cfg), CloneVerdict::Unavailable);
    }

    #[test]
    fn custom_config_is_respected() {
        let cfg = CloneCheckConfig {
            tau_exact: 0.01,
            tau_likely: 0.05,
            tau_suspect: 0.2,
            s_min: 2.0,
        };
        assert_eq!(classify(m(0.03, 3.0), &cfg), CloneVerdict::Likely);
    }
}
