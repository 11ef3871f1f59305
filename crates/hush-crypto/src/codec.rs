//! Envelope transport codec.
//!
//! Pure format transformation, no cryptography. The ciphertext blob is
//! `base64(iv || ciphertext)`, where `iv` is exactly [`IV_LEN`] bytes and
//! `ciphertext` carries the AES-GCM tag in its last [`TAG_LEN`] bytes.
//! Wrapped session keys use the same base64 alphabet.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};

use crate::error::MalformedEnvelope;

/// AES-GCM nonce size (96 bits)
pub const IV_LEN: usize = 12;

/// AES-GCM authentication tag size (128 bits)
pub const TAG_LEN: usize = 16;

/// Encode an IV and ciphertext into a single transport string.
pub fn encode(iv: &[u8; IV_LEN], ciphertext: &[u8]) -> String {
    let mut bytes = Vec::with_capacity(IV_LEN + ciphertext.len());
    bytes.extend_from_slice(iv);
    bytes.extend_from_slice(ciphertext);
    BASE64.encode(bytes)
}

/// Split a transport string back into `(iv, ciphertext)`.
///
/// # Errors
///
/// - `InvalidEncoding`: the blob is not valid base64
/// - `TooShort`: the decoded blob cannot hold an IV
pub fn decode(blob: &str) -> Result<([u8; IV_LEN], Vec<u8>), MalformedEnvelope> {
    let mut bytes = BASE64.decode(blob).map_err(|_| MalformedEnvelope::InvalidEncoding)?;

    if bytes.len() < IV_LEN {
        return Err(MalformedEnvelope::TooShort { len: bytes.len(), min: IV_LEN });
    }

    let ciphertext = bytes.split_off(IV_LEN);
    let mut iv = [0u8; IV_LEN];
    iv.copy_from_slice(&bytes);

    Ok((iv, ciphertext))
}

/// Encode wrapped session-key bytes.
pub fn encode_key(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Decode wrapped session-key bytes.
pub fn decode_key(blob: &str) -> Result<Vec<u8>, MalformedEnvelope> {
    BASE64.decode(blob).map_err(|_| MalformedEnvelope::InvalidEncoding)
}
