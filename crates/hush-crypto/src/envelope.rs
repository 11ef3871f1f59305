//! Envelope wire types.
//!
//! The JSON shape is fixed by the transport layer:
//!
//! ```text
//! {
//!   "encryptedBody": "<base64(iv || ciphertext)>",
//!   "encryptedKeys": [ { "user": "<recipient id>", "key": "<base64 wrapped key>" } ]
//! }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity a message is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipientId(String);

impl RecipientId {
    /// Wrap an identity string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecipientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecipientId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RecipientId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A session key wrapped for one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedKey {
    /// Recipient this entry is addressed to
    #[serde(rename = "user")]
    pub recipient: RecipientId,
    /// Base64 RSA-OAEP ciphertext of the session key
    #[serde(rename = "key")]
    pub blob: String,
}

/// The encrypted message unit carried by the transport.
///
/// Created once by `seal` and never mutated afterwards. An edited message is
/// a new envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Base64 of the IV followed by the AES-GCM ciphertext and tag
    #[serde(rename = "encryptedBody")]
    pub ciphertext_blob: String,
    /// One wrapped session key per recipient, in seal order
    #[serde(rename = "encryptedKeys", default)]
    pub wrapped_keys: Vec<WrappedKey>,
}

impl Envelope {
    /// The wrapped-key entry addressed to `recipient`, if any.
    ///
    /// When an envelope carries duplicate entries the first one wins.
    pub fn wrapped_key_for(&self, recipient: &RecipientId) -> Option<&WrappedKey> {
        self.wrapped_keys.iter().find(|entry| &entry.recipient == recipient)
    }

    /// Whether this envelope carries a wrapped key for `recipient`.
    pub fn is_addressed_to(&self, recipient: &RecipientId) -> bool {
        self.wrapped_key_for(recipient).is_some()
    }

    /// Recipients in wire order.
    pub fn recipients(&self) -> impl Iterator<Item = &RecipientId> {
        self.wrapped_keys.iter().map(|entry| &entry.recipient)
    }
}
