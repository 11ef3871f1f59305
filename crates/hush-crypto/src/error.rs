//! Error types for the Hush cryptographic core.
//!
//! Each layer has its own error type:
//! - `KeyError`: key generation, import and export
//! - `MalformedEnvelope`: transport-encoding violations found by the codec
//! - `SealError`: failures while producing an envelope
//! - `OpenError`: the tagged failure kinds returned to a recipient
//!
//! None of these carry key material, plaintext, or the underlying library
//! error. Callers get the failure kind and nothing else.

use thiserror::Error;

use crate::envelope::RecipientId;

/// Errors from key generation, import and export.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// The RNG or prime search failed while generating a key pair
    #[error("key pair generation failed")]
    Generation,

    /// Public key bytes are not a valid RSA SubjectPublicKeyInfo
    #[error("invalid public key encoding")]
    InvalidPublicKey,

    /// Private key bytes are not a valid RSA PKCS#8 document
    #[error("invalid private key encoding")]
    InvalidPrivateKey,

    /// Key modulus is below the accepted minimum
    #[error("key too weak: {bits}-bit modulus, need at least {min}")]
    WeakKey {
        /// Modulus size of the rejected key
        bits: usize,
        /// Smallest accepted modulus size
        min: usize,
    },
}

/// Transport-encoding violation in an envelope blob.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedEnvelope {
    /// Decoded blob cannot even hold the initialization vector
    #[error("malformed envelope: blob is {len} bytes, need at least {min}")]
    TooShort {
        /// Decoded blob length
        len: usize,
        /// Minimum length (the IV size)
        min: usize,
    },

    /// Blob is not valid base64
    #[error("malformed envelope: invalid transport encoding")]
    InvalidEncoding,
}

/// Errors while sealing a message.
///
/// With well-formed keys these do not happen in practice; they exist so a
/// broken RNG or an oversized body surfaces as a value instead of a panic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SealError {
    /// AES-GCM refused the plaintext
    #[error("body encryption failed")]
    EncryptFailed,

    /// RSA-OAEP could not wrap the session key for a recipient
    #[error("failed to wrap session key for {recipient}")]
    WrapFailed {
        /// Recipient whose key could not be used
        recipient: RecipientId,
    },
}

/// Failure kinds returned by [`crate::HybridCipher::open`].
///
/// All variants are terminal for that call. No partial plaintext is ever
/// returned alongside them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OpenError {
    /// The envelope has no wrapped key for this identity
    #[error("message is not addressed to this identity")]
    NoMatchingRecipient,

    /// The session key could not be recovered with the local private key
    #[error("failed to unwrap session key")]
    UnwrapFailed,

    /// Authenticated decryption of the body failed
    #[error("failed to decrypt message body")]
    DecryptFailed,

    /// The ciphertext blob violates the transport encoding
    #[error(transparent)]
    MalformedEnvelope(#[from] MalformedEnvelope),
}

impl OpenError {
    /// Returns true for the non-cryptographic outcome.
    ///
    /// `NoMatchingRecipient` is the normal result for messages sent before
    /// this identity existed, or addressed to someone else. Every other kind
    /// means the data or the key is wrong.
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::NoMatchingRecipient)
    }

    /// Short stable label, safe for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoMatchingRecipient => "no_matching_recipient",
            Self::UnwrapFailed => "unwrap_failed",
            Self::DecryptFailed => "decrypt_failed",
            Self::MalformedEnvelope(_) => "malformed_envelope",
        }
    }
}
