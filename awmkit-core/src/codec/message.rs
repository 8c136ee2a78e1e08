//! Wire message encode/decode for both supported versions.
//!
//! Version 1 carries no key-slot bits at all (it predates multi-slot key
//! management): version, timestamp, and the 5-bit-packed tag fill the
//! first 10 bytes, leaving a 48-bit HMAC tail in the last 6 bytes. Version
//! 2 bit-packs the header into 90 bits, adding a 5-bit key-slot field, and
//! leaves a narrower 38-bit HMAC tail.
//!
//! Both versions authenticate the header with HMAC-SHA256, truncated to
//! whatever tail width the format's bit budget leaves: 48 bits for v1, 38
//! bits for v2. Comparison against the expected tail is constant-time.

use crate::error::AwmError;
use crate::tag::alphabet::{char_of, value_of};
use crate::tag::identity_from_packed_tag;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Fixed wire message length in bytes, for both versions.
pub const MESSAGE_LEN: usize = 16;

/// HMAC tail width for the v1 (no-slot) format, in bits.
pub const HMAC_TAIL_BITS_V1: usize = 48;
/// HMAC tail width for the v2 (bit-packed) format, in bits.
pub const HMAC_TAIL_BITS_V2: usize = 38;
/// Re-exported for callers that only care about the denser v2 format.
pub const HMAC_TAIL_BITS: usize = HMAC_TAIL_BITS_V2;

/// v1 header length in bytes: version(1) + timestamp(4) + packed tag(5).
const V1_HEADER_LEN: usize = 10;
const V2_HEADER_BITS: usize = 90;
const V2_RESERVED_BITS: usize = 8;

/// A decoded wire message: the header fields common to both versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireMessage {
    pub version: u8,
    pub key_slot: u8,
    pub timestamp_minutes: u32,
    /// The tag string as reconstructed from the wire. For v2 this may read
    /// `A` where the original tag had a `_` pad character — see
    /// [`crate::tag::identity_from_packed_tag`].
    pub tag: String,
}

fn hmac_tail(key: &[u8], header: &[u8], take_bits: usize) -> Result<u64, AwmError> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|e| AwmError::Io(format!("bad HMAC key: {e}")))?;
    mac.update(header);
    let digest = mac.finalize().into_bytes();
    let take_bytes = take_bits.div_ceil(8);
    let mut acc: u64 = 0;
    for &b in &digest[..take_bytes] {
        acc = (acc << 8) | b as u64;
    }
    let extra_bits = take_bytes * 8 - take_bits;
    Ok(acc >> extra_bits)
}

/// Packs the v1 header's fields (version, timestamp, 5-bit tag chars) into
/// its 10-byte on-wire form.
fn v1_header_bytes(msg: &WireMessage) -> Result<[u8; V1_HEADER_LEN], AwmError> {
    if !crate::tag::tag_verify(&msg.tag) {
        return Err(AwmError::InvalidTag);
    }
    // v1 has no slot bits on the wire; it only ever signs with slot 0.
    if msg.key_slot != 0 {
        return Err(AwmError::InvalidMessageLength);
    }
    let tag_bytes = msg.tag.as_bytes();
    if tag_bytes.len() != 8 {
        return Err(AwmError::InvalidTag);
    }

    let mut fields: Vec<(u64, u32)> = vec![(1, 8), (msg.timestamp_minutes as u64, 32)];
    for &c in tag_bytes {
        let v = value_of(c).ok_or(AwmError::InvalidTag)?;
        fields.push((v as u64, 5));
    }
    let header80 = pack_bits(&fields);

    let mut out = [0u8; V1_HEADER_LEN];
    out.copy_from_slice(&header80.to_be_bytes()[16 - V1_HEADER_LEN..]);
    Ok(out)
}

fn encode_v1(msg: &WireMessage, key: &[u8]) -> Result<[u8; MESSAGE_LEN], AwmError> {
    let header = v1_header_bytes(msg)?;
    let tail = hmac_tail(key, &header, HMAC_TAIL_BITS_V1)?;

    let mut out = [0u8; MESSAGE_LEN];
    out[..V1_HEADER_LEN].copy_from_slice(&header);
    out[V1_HEADER_LEN..].copy_from_slice(&tail.to_be_bytes()[8 - (HMAC_TAIL_BITS_V1 / 8)..]);
    Ok(out)
}

fn decode_v1(bytes: &[u8; MESSAGE_LEN], key: Option<&[u8]>) -> Result<WireMessage, AwmError> {
    let header = &bytes[..V1_HEADER_LEN];
    let mut padded = [0u8; 16];
    padded[16 - V1_HEADER_LEN..].copy_from_slice(header);
    let header80 = u128::from_be_bytes(padded);

    let timestamp_minutes = ((header80 >> 40) & 0xFFFF_FFFF) as u32;
    let tag_bits = header80 & 0xFF_FFFF_FFFF;

    let mut tag_chars = [0u8; 8];
    for (i, slot) in tag_chars.iter_mut().enumerate() {
        let shift = (7 - i) * 5;
        let v = ((tag_bits >> shift) & 0x1F) as u8;
        *slot = char_of(v);
    }
    let tag = String::from_utf8(tag_chars.to_vec()).map_err(|_| AwmError::InvalidUtf8)?;
    if !crate::tag::tag_verify(&tag) {
        return Err(AwmError::InvalidTag);
    }

    if let Some(key) = key {
        let expected = hmac_tail(key, header, HMAC_TAIL_BITS_V1)?;
        let actual_bytes = &bytes[V1_HEADER_LEN..];
        let mut actual_padded = [0u8; 8];
        actual_padded[8 - actual_bytes.len()..].copy_from_slice(actual_bytes);
        let actual = u64::from_be_bytes(actual_padded);
        if expected.ct_eq(&actual).unwrap_u8() == 0 {
            return Err(AwmError::HmacMismatch);
        }
    }

    Ok(WireMessage {
        version: 1,
        // v1 carries no slot bits on the wire.
        key_slot: 0,
        timestamp_minutes,
        tag,
    })
}

fn pack_bits(fields: &[(u64, u32)]) -> u128 {
    let mut acc: u128 = 0;
    for &(value, width) in fields {
        let mask = if width == 64 {
            u64::MAX
        } else {
            (1u64 << width) - 1
        };
        acc = (acc << width) | (value & mask) as u128;
    }
    acc
}

fn v2_header_bits(msg: &WireMessage) -> Result<u128, AwmError> {
    if !crate::tag::tag_verify(&msg.tag) {
        return Err(AwmError::InvalidTag);
    }
    if msg.key_slot >= 32 {
        return Err(AwmError::InvalidMessageLength);
    }
    let tag_bytes = msg.tag.as_bytes();
    if tag_bytes.len() != 8 {
        return Err(AwmError::InvalidTag);
    }

    let mut fields: Vec<(u64, u32)> = vec![
        (2, 5), // version
        (msg.key_slot as u64, 5),
        (msg.timestamp_minutes as u64, 32),
    ];
    for &c in tag_bytes {
        let v = value_of(c).ok_or(AwmError::InvalidTag)?;
        fields.push((v as u64, 5));
    }
    fields.push((0, V2_RESERVED_BITS as u32));

    Ok(pack_bits(&fields))
}

fn hmac_header_bytes(header90: u128) -> [u8; 12] {
    let padded = header90 << (96 - V2_HEADER_BITS);
    let full = padded.to_be_bytes();
    let mut out = [0u8; 12];
    out.copy_from_slice(&full[4..16]);
    out
}

fn encode_v2(msg: &WireMessage, key: &[u8]) -> Result<[u8; MESSAGE_LEN], AwmError> {
    let header90 = v2_header_bits(msg)?;
    let hmac_input = hmac_header_bytes(header90);
    let tail = hmac_tail(key, &hmac_input, HMAC_TAIL_BITS_V2)?;

    let full: u128 = (header90 << HMAC_TAIL_BITS_V2) | tail as u128;
    let bytes16 = full.to_be_bytes();
    let mut out = [0u8; MESSAGE_LEN];
    out.copy_from_slice(&bytes16);
    Ok(out)
}

fn decode_v2(bytes: &[u8; MESSAGE_LEN], key: Option<&[u8]>) -> Result<WireMessage, AwmError> {
    let full = u128::from_be_bytes(*bytes);
    let tail_mask: u128 = (1u128 << HMAC_TAIL_BITS_V2) - 1;
    let tail = (full & tail_mask) as u64;
    let header90 = full >> HMAC_TAIL_BITS_V2;

    let version = ((header90 >> 85) & 0x1F) as u8;
    let key_slot = ((header90 >> 80) & 0x1F) as u8;
    let timestamp_minutes = ((header90 >> 48) & 0xFFFF_FFFF) as u32;
    let tag_bits = (header90 >> 8) & 0xFF_FFFF_FFFF;

    let mut tag_chars = [0u8; 8];
    for (i, slot) in tag_chars.iter_mut().enumerate() {
        let shift = (7 - i) * 5;
        let v = ((tag_bits >> shift) & 0x1F) as u8;
        *slot = char_of(v);
    }
    let tag = String::from_utf8(tag_chars.to_vec()).map_err(|_| AwmError::InvalidUtf8)?;
    if !crate::tag::tag_verify(&tag) {
        return Err(AwmError::InvalidTag);
    }

    if let Some(key) = key {
        let hmac_input = hmac_header_bytes(header90);
        let expected = hmac_tail(key, &hmac_input, HMAC_TAIL_BITS_V2)?;
        if expected.ct_eq(&tail).unwrap_u8() == 0 {
            return Err(AwmError::HmacMismatch);
        }
    }

    Ok(WireMessage {
        version,
        key_slot,
        timestamp_minutes,
        tag,
    })
}

/// Encodes `msg` into a 16-byte authenticated wire message under `key`.
///
/// `msg.version` selects the wire format (1 or 2); any other value is
/// rejected. `msg.tag` must already be a valid 8-character tag (see
/// [`crate::tag::tag_new`]).
pub fn encode(msg: &WireMessage, key: &[u8]) -> Result<[u8; MESSAGE_LEN], AwmError> {
    match msg.version {
        1 => encode_v1(msg, key),
        2 => encode_v2(msg, key),
        _ => Err(AwmError::InvalidMessageLength),
    }
}

/// Decodes and authenticates a 16-byte wire message under `key`.
///
/// Checks, in order: exact length, a recognized version marker, internal
/// tag-checksum consistency, then the HMAC tail (constant-time compare).
pub fn decode(bytes: &[u8], key: &[u8]) -> Result<WireMessage, AwmError> {
    decode_inner(bytes, Some(key))
}

/// Decodes a 16-byte wire message without checking its HMAC tail.
///
/// Useful for diagnostics (inspecting a message's claimed fields when the
/// signing key is unknown or intentionally not checked yet).
pub fn decode_unverified(bytes: &[u8]) -> Result<WireMessage, AwmError> {
    decode_inner(bytes, None)
}

fn decode_inner(bytes: &[u8], key: Option<&[u8]>) -> Result<WireMessage, AwmError> {
    let bytes: &[u8; MESSAGE_LEN] = bytes
        .try_into()
        .map_err(|_| AwmError::InvalidMessageLength)?;

    if bytes[0] == 1 {
        decode_v1(bytes, key)
    } else if bytes[0] >> 3 == 2 {
        decode_v2(bytes, key)
    } else {
        Err(AwmError::InvalidMessageLength)
    }
}

/// `true` if `bytes` decodes and authenticates cleanly under `key`.
pub fn verify(bytes: &[u8], key: &[u8]) -> bool {
    decode(bytes, key).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(version: u8, tag: &str) -> WireMessage {
        WireMessage {
            version,
            // v1 has no slot bits on the wire; only v2 carries a real slot.
            key_slot: if version == 1 { 0 } else { 3 },
            timestamp_minutes: 28_449_612,
            tag: tag.to_string(),
        }
    }

    #[test]
    fn v1_round_trips() {
        let key = b"test-key-0123456";
        let original = msg(1, "SAKUZY_N");
        let bytes = encode(&original, key).unwrap();
        assert_eq!(bytes.len(), MESSAGE_LEN);
        let decoded = decode(&bytes, key).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn v2_round_trips_modulo_pad_a_collision() {
        let key = b"test-key-0123456";
        let original = msg(2, "SAKUZY_N");
        let bytes = encode(&original, key).unwrap();
        let decoded = decode(&bytes, key).unwrap();
        assert_eq!(decoded.version, 2);
        assert_eq!(decoded.key_slot, original.key_slot);
        assert_eq!(decoded.timestamp_minutes, original.timestamp_minutes);
        // '_' and 'A' collide in the 5-bit packed form.
        assert_eq!(decoded.tag, "SAKUZYAN");
        assert_eq!(
            crate::tag::identity_from_packed_tag(&decoded.tag),
            crate::tag::tag_identity(&original.tag).unwrap()
        );
    }

    #[test]
    fn v2_round_trips_exactly_without_pad_chars() {
        let key = b"another-key-here";
        // A 7-character identity with no '_' pad has nothing to collide.
        let tag = crate::tag::tag_new("ALICEFG").unwrap();
        let original = msg(2, &tag);
        let bytes = encode(&original, key).unwrap();
        let decoded = decode(&bytes, key).unwrap();
        assert_eq!(decoded.tag, original.tag);
    }

    #[test]
    fn wrong_key_fails_verification() {
        let bytes = encode(&msg(2, "SAKUZY_N"), b"right-key-000000").unwrap();
        assert!(!verify(&bytes, b"wrong-key-000000"));
    }

    #[test]
    fn decode_unverified_ignores_hmac() {
        let mut bytes = encode(&msg(1, "SAKUZY_N"), b"k").unwrap();
        bytes[15] ^= 0xFF;
        assert!(decode(&bytes, b"k").is_err());
        assert!(decode_unverified(&bytes).is_ok());
    }

    #[test]
    fn wrong_length_is_rejected() {
        let short = [0u8; 10];
        assert!(matches!(
            decode(&short, b"k"),
            Err(AwmError::InvalidMessageLength)
        ));
    }

    #[test]
    fn unrecognized_version_marker_is_rejected() {
        let mut bytes = [0u8; MESSAGE_LEN];
        bytes[0] = 0x7F;
        assert!(matches!(
            decode(&bytes, b"k"),
            Err(AwmError::InvalidMessageLength)
        ));
    }

    #[test]
    fn single_bit_flip_in_header_breaks_verification() {
        let bytes = encode(&msg(2, "SAKUZY_N"), b"test-key-0123456").unwrap();
        for i in 0..MESSAGE_LEN {
            for bit in 0..8 {
                let mut mutated = bytes;
                mutated[i] ^= 1 << bit;
                if mutated == bytes {
                    continue;
                }
                assert!(
                    !verify(&mutated, b"test-key-0123456"),
                    "byte {i} bit {bit} flip was not detected"
                );
            }
        }
    }

    #[test]
    fn encode_rejects_invalid_tag() {
        let bad = msg(2, "NOTVALID");
        assert!(matches!(
            encode(&bad, b"k"),
            Err(AwmError::InvalidTag)
        ));
    }

    #[test]
    fn encode_rejects_unknown_version() {
        let bad = msg(9, "SAKUZY_N");
        assert!(matches!(
            encode(&bad, b"k"),
            Err(AwmError::InvalidMessageLength)
        ));
    }

    #[test]
    fn v1_rejects_nonzero_key_slot() {
        let mut bad = msg(1, "SAKUZY_N");
        bad.key_slot = 3;
        assert!(matches!(
            encode(&bad, b"k"),
            Err(AwmError::InvalidMessageLength)
        ));
    }

    #[test]
    fn v1_decode_always_reports_slot_zero() {
        let key = b"test-key-0123456";
        let bytes = encode(&msg(1, "SAKUZY_N"), key).unwrap();
        let decoded = decode(&bytes, key).unwrap();
        assert_eq!(decoded.key_slot, 0);
    }
}
