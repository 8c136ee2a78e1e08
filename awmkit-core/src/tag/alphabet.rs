//! The 32-character Base32 alphabet (RFC 4648) used by tags and identities.
//!
//! This is not the standard `base32` crate's alphabet handling: the pad
//! character here is `_`, never `=`, and padding is meaningful data (it is
//! part of a fixed-width tag), not a framing artifact.

/// RFC 4648 Base32 alphabet, case-insensitive on input, canonical upper-case.
pub const ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Pad character used within tags. Distinct from the RFC 4648 `=` pad.
pub const PAD: u8 = b'_';

/// Returns `true` if `c` (already upper-cased) is a valid alphabet character
/// or the pad character.
pub fn is_alphabet_or_pad(c: u8) -> bool {
    c == PAD || ALPHABET.contains(&c)
}

/// Maps an alphabet character (or the pad character) to its 5-bit value.
///
/// `_` maps to 0, identically to `A` — the alphabet has no spare code point
/// for a distinct pad value (see checksum.rs for why this is intentional).
pub fn value_of(c: u8) -> Option<u8> {
    if c == PAD {
        return Some(0);
    }
    ALPHABET.iter().position(|&a| a == c).map(|i| i as u8)
}

/// Maps a 5-bit value (0..=31) back to its canonical alphabet character.
///
/// This never returns the pad character: the packed wire representation
/// cannot distinguish `_` from `A`, so unpacking always yields `A` for
/// value 0. Callers reconstructing an identity from a decoded tag must
/// treat a trailing run of `A` as possible padding (see
/// `tag::identity_from_packed_tag`).
pub fn char_of(v: u8) -> u8 {
    ALPHABET[(v & 0x1F) as usize]
}

/// Upper-cases ASCII and replaces `-` with `_`, per the identity
/// normalization rule.
pub fn normalize(input: &str) -> String {
    input
        .chars()
        .map(|c| {
            let c = c.to_ascii_uppercase();
            if c == '-' { '_' } else { c }
        })
        .collect()
}
