//! The 16-byte authenticated wire message: encode, decode, and verify.

pub mod message;

pub use message::{
    HMAC_TAIL_BITS, HMAC_TAIL_BITS_V1, HMAC_TAIL_BITS_V2, MESSAGE_LEN, WireMessage, decode,
    decode_unverified, encode, verify,
};
