//! Tag algebra: 8-character checksummed encodings of a short identity.
//!
//! A tag is the only form of an identity that is ever embedded in audio.
//! It is built from a 1–7 character identity by right-padding with `_` to
//! length 7 and appending a checksum character (see [`checksum`]).

pub mod alphabet;
pub mod checksum;

use crate::error::AwmError;
use alphabet::{PAD, char_of, is_alphabet_or_pad, normalize};
use checksum::checksum_char;
use sha2::{Digest, Sha256};

const IDENTITY_MAX_LEN: usize = 7;
const TAG_LEN: usize = 8;

/// Builds a valid 8-character tag from a user-supplied identity string.
///
/// Upper-cases the input and replaces `-` with `_`; rejects empty input,
/// input longer than 7 characters, or input containing characters outside
/// the alphabet ∪ {`_`}. Right-pads to 7 characters with `_` and appends
/// the checksum character.
pub fn tag_new(identity: &str) -> Result<String, AwmError> {
    let normalized = normalize(identity);
    if normalized.is_empty() || normalized.len() > IDENTITY_MAX_LEN {
        return Err(AwmError::InvalidTag);
    }
    if !normalized.bytes().all(is_alphabet_or_pad) {
        return Err(AwmError::InvalidTag);
    }

    let mut body = [PAD; IDENTITY_MAX_LEN];
    body[..normalized.len()].copy_from_slice(normalized.as_bytes());

    let mut tag = String::with_capacity(TAG_LEN);
    tag.push_str(std::str::from_utf8(&body).expect("body is ASCII"));
    tag.push(checksum_char(&body) as char);
    Ok(tag)
}

/// Verifies that `tag` is exactly 8 characters from the alphabet ∪ {`_`}
/// and that its checksum matches.
pub fn tag_verify(tag: &str) -> bool {
    let bytes = tag.as_bytes();
    if bytes.len() != TAG_LEN {
        return false;
    }
    if !bytes.iter().all(|&c| is_alphabet_or_pad(c)) {
        return false;
    }
    let mut body = [0u8; IDENTITY_MAX_LEN];
    body.copy_from_slice(&bytes[..IDENTITY_MAX_LEN]);
    checksum_char(&body) == bytes[TAG_LEN - 1]
}

/// Verifies `tag`, then strips trailing `_` padding and the checksum
/// character, returning the identity prefix.
///
/// This operates on a literal tag string (one that still carries real `_`
/// pad characters, e.g. fresh from [`tag_new`] or a caller-validated
/// string) — it is not the same operation as reconstructing an identity
/// from a tag that has round-tripped through the bit-packed wire codec;
/// use [`identity_from_packed_tag`] for that case.
pub fn tag_identity(tag: &str) -> Result<String, AwmError> {
    if !tag_verify(tag) {
        return Err(AwmError::InvalidTag);
    }
    let body = &tag.as_bytes()[..IDENTITY_MAX_LEN];
    let trimmed = body
        .iter()
        .rposition(|&c| c != PAD)
        .map(|last| &body[..=last])
        .unwrap_or(&[]);
    Ok(String::from_utf8_lossy(trimmed).into_owned())
}

/// Reconstructs an identity from a tag that has been unpacked from the
/// bit-packed wire message (see `codec::message`).
///
/// Packing collapses `_` and `A` to the same 5-bit value, so a tag that
/// survived a codec round trip cannot distinguish trailing pad from a
/// trailing literal `A`. This strips a trailing run of *either* character,
/// matching the only ambiguity the wire format can introduce (see
/// DESIGN.md for the full rationale). At least one character is always
/// retained even if the whole body is padding/`A`.
pub fn identity_from_packed_tag(tag: &str) -> String {
    let body = &tag.as_bytes()[..IDENTITY_MAX_LEN.min(tag.len())];
    let last = body
        .iter()
        .rposition(|&c| c != PAD && c != b'A')
        .map(|i| i + 1)
        .unwrap_or(0);
    let keep = last.max(if body.is_empty() { 0 } else { 1 });
    String::from_utf8_lossy(&body[..keep.min(body.len())]).into_owned()
}

/// Derives a deterministic, valid tag from an arbitrary username.
///
/// SHA-256 the UTF-8 bytes of `username`, Base32-encode the first 5 bytes
/// of the digest (40 bits = 8 five-bit groups, so no padding is needed),
/// then overwrite the final character with the checksum of the first 7.
pub fn tag_suggest(username: &str) -> String {
    let digest = Sha256::digest(username.as_bytes());
    let five = &digest[..5];

    // 5 bytes = 40 bits = 8 groups of 5 bits, MSB-first.
    let mut acc: u64 = 0;
    for &b in five {
        acc = (acc << 8) | b as u64;
    }

    let mut chars = [0u8; TAG_LEN];
    for i in 0..TAG_LEN {
        let shift = (TAG_LEN - 1 - i) * 5;
        let v = ((acc >> shift) & 0x1F) as u8;
        chars[i] = char_of(v);
    }

    let mut body = [0u8; IDENTITY_MAX_LEN];
    body.copy_from_slice(&chars[..IDENTITY_MAX_LEN]);
    chars[TAG_LEN - 1] = checksum_char(&body);

    String::from_utf8(chars.to_vec()).expect("alphabet is ASCII")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_new_pads_and_checksums_sakuzy() {
        let tag = tag_new("SAKUZY").expect("valid identity");
        assert_eq!(tag, "SAKUZY_N");
        assert!(tag_verify(&tag));
    }

    #[test]
    fn tag_new_normalizes_case_and_hyphen() {
        let tag = tag_new("al-ice").expect("valid identity");
        assert_eq!(tag, tag_new("AL_ICE").unwrap());
    }

    #[test]
    fn tag_new_rejects_empty_and_overlong() {
        assert!(matches!(tag_new(""), Err(AwmError::InvalidTag)));
        assert!(matches!(tag_new("TOOLONGID"), Err(AwmError::InvalidTag)));
    }

    #[test]
    fn tag_new_rejects_invalid_chars() {
        assert!(matches!(tag_new("AB!D"), Err(AwmError::InvalidTag)));
        assert!(matches!(tag_new("AB01"), Err(AwmError::InvalidTag)));
    }

    #[test]
    fn tag_identity_round_trips_through_tag_new() {
        for id in ["SAKUZY", "A", "ABCDEFG", "AL_ICE"] {
            let tag = tag_new(id).unwrap();
            assert_eq!(tag_identity(&tag).unwrap(), id);
        }
    }

    #[test]
    fn tag_verify_rejects_wrong_length_and_bad_checksum() {
        assert!(!tag_verify("SAKUZY_"));
        assert!(!tag_verify("SAKUZY_X"));
        assert!(!tag_verify("SAKUZY_N1"));
    }

    #[test]
    fn flipping_a_single_char_breaks_verification_with_high_probability() {
        let tag = tag_new("SAKUZY").unwrap();
        let mut broke = 0;
        let total = tag.len();
        for i in 0..total {
            let mut bytes = tag.clone().into_bytes();
            let original = bytes[i];
            // Rotate through the alphabet looking for a different valid char.
            for &candidate in alphabet::ALPHABET.iter() {
                if candidate != original {
                    bytes[i] = candidate;
                    break;
                }
            }
            let mutated = String::from_utf8(bytes).unwrap();
            if !tag_verify(&mutated) {
                broke += 1;
            }
        }
        // At least 31/32 of single-char flips should break verification;
        // with one flip per position here, all but at most rounding should.
        assert!(broke as f64 / total as f64 >= 31.0 / 32.0 - 1e-9 || broke == total);
    }

    #[test]
    fn tag_suggest_is_deterministic_and_valid() {
        let a = tag_suggest("alice@example.com");
        let b = tag_suggest("alice@example.com");
        assert_eq!(a, b);
        assert!(tag_verify(&a));
        assert_eq!(a.len(), TAG_LEN);
    }

    #[test]
    fn tag_suggest_identity_is_leading_seven_chars() {
        let tag = tag_suggest("alice@example.com");
        let identity = tag_identity(&tag).unwrap();
        assert!(tag.starts_with(&identity));
        assert!(identity.len() <= IDENTITY_MAX_LEN);
    }

    #[test]
    fn identity_from_packed_tag_strips_pad_and_a_collision() {
        // "SAKUZY" + pad -> packed form reconstructs 'A' in place of '_'.
        assert_eq!(identity_from_packed_tag("SAKUZYAN"), "SAKUZY");
        // A literal 7-char identity has nothing to strip.
        assert_eq!(identity_from_packed_tag("ABCDEFGH"), "ABCDEFG");
    }
}
