//! Hush Cryptographic Core
//!
//! End-to-end encryption for chat messages. A sender encrypts a body once and
//! every recipient can decrypt it independently with their own private key.
//! The transport only ever sees the opaque [`Envelope`].
//!
//! # Protocol
//!
//! ```text
//! seal:
//!   random session key (256 bit) ─┐
//!   random IV (96 bit) ───────────┼─► AES-256-GCM(plaintext) ─► encryptedBody
//!                                 │
//!                                 └─► RSA-OAEP-SHA256(recipient pk) ─► encryptedKeys[i]
//!
//! open:
//!   encryptedKeys[self] ─► RSA-OAEP(private key) ─► session key
//!   encryptedBody ───────► AES-256-GCM(session key) ─► plaintext
//! ```
//!
//! # Security
//!
//! Freshness:
//! - A new session key and IV are drawn for every envelope
//! - Sealing the same plaintext twice produces unrelated ciphertexts
//!
//! Authenticity:
//! - AES-GCM tag covers the whole body; tampering yields `DecryptFailed`
//! - RSA-OAEP padding check rejects wrapped keys for another identity
//!
//! Failure isolation:
//! - `open` returns a tagged [`OpenError`] and never partial plaintext
//! - Errors never carry key material or library internals
//!
//! Not provided: forward secrecy (keys are static), key rotation, and
//! multi-device sync. A private key exists on exactly one installation;
//! history encrypted to it is unreadable anywhere else.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod cipher;
pub mod codec;
mod envelope;
mod error;
mod keys;

pub use cipher::{HybridCipher, KeyCoverage, RecipientKeyMap, SESSION_KEY_LEN, Sealed};
pub use envelope::{Envelope, RecipientId, WrappedKey};
pub use error::{KeyError, MalformedEnvelope, OpenError, SealError};
pub use keys::{FINGERPRINT_SIZE, KeyPair, MIN_MODULUS_BITS, MODULUS_BITS, PrivateKey, PublicKey};
