//! Hybrid envelope encryption.
//!
//! `seal` encrypts a body once under a fresh AES-256-GCM session key and
//! wraps that key for every recipient with RSA-OAEP. `open` finds the entry
//! for the local identity, unwraps the session key and decrypts the body.
//!
//! The cipher holds no state. Every call draws its own session key and IV,
//! so any number of `seal`/`open` calls may run concurrently.

use std::collections::BTreeMap;

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, KeyInit},
};
use rand::{CryptoRng, RngCore, rngs::OsRng};
use zeroize::Zeroizing;

use crate::{
    codec::{self, IV_LEN},
    envelope::{Envelope, RecipientId, WrappedKey},
    error::{KeyError, OpenError, SealError},
    keys::{PrivateKey, PublicKey},
};

/// AES-256 session key size (256 bits)
pub const SESSION_KEY_LEN: usize = 32;

/// Recipients requested by the caller, with their published keys.
///
/// A recipient without a published key is still recorded, so that
/// [`KeyCoverage`] can report it. Ordered by recipient id; inserting the same
/// id twice replaces the earlier entry.
#[derive(Debug, Clone, Default)]
pub struct RecipientKeyMap {
    keys: BTreeMap<RecipientId, Option<PublicKey>>,
}

impl RecipientKeyMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a recipient with a parsed public key.
    pub fn insert(&mut self, recipient: impl Into<RecipientId>, key: PublicKey) {
        self.keys.insert(recipient.into(), Some(key));
    }

    /// Add a recipient from the base64 form published in their profile.
    pub fn insert_encoded(
        &mut self,
        recipient: impl Into<RecipientId>,
        encoded: &str,
    ) -> Result<(), KeyError> {
        let key = PublicKey::from_base64(encoded)?;
        self.insert(recipient, key);
        Ok(())
    }

    /// Record a recipient who has not published a public key.
    pub fn insert_missing(&mut self, recipient: impl Into<RecipientId>) {
        self.keys.insert(recipient.into(), None);
    }

    /// Number of requested recipients, with or without keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether no recipient was requested at all.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Number of recipients with a usable public key.
    pub fn with_keys(&self) -> usize {
        self.keys.values().filter(|key| key.is_some()).count()
    }

    fn iter(&self) -> impl Iterator<Item = (&RecipientId, Option<&PublicKey>)> {
        self.keys.iter().map(|(id, key)| (id, key.as_ref()))
    }
}

impl FromIterator<(RecipientId, PublicKey)> for RecipientKeyMap {
    fn from_iter<I: IntoIterator<Item = (RecipientId, PublicKey)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (recipient, key) in iter {
            map.insert(recipient, key);
        }
        map
    }
}

/// How many requested recipients can actually read a sealed envelope.
///
/// The cipher never decides whether to fall back to an unencrypted send. It
/// reports coverage and leaves that policy to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCoverage {
    /// Recipients the caller asked for
    pub requested: usize,
    /// Recipients that received a wrapped key
    pub with_keys: usize,
    /// Recipients left out because they have no published key
    pub missing: Vec<RecipientId>,
}

impl KeyCoverage {
    /// Every requested recipient received a wrapped key.
    pub fn is_complete(&self) -> bool {
        self.with_keys == self.requested
    }

    /// Nobody can open the envelope.
    pub fn is_empty(&self) -> bool {
        self.with_keys == 0
    }
}

/// Result of a successful seal.
#[derive(Debug, Clone)]
pub struct Sealed {
    /// The envelope to hand to the transport
    pub envelope: Envelope,
    /// Which requested recipients were covered
    pub coverage: KeyCoverage,
}

/// Stateless hybrid RSA-OAEP / AES-256-GCM cipher.
#[derive(Debug, Clone, Copy, Default)]
pub struct HybridCipher;

impl HybridCipher {
    /// Create a cipher.
    pub fn new() -> Self {
        Self
    }

    /// Seal a text message for every recipient in `recipients`.
    pub fn seal(&self, plaintext: &str, recipients: &RecipientKeyMap) -> Result<Sealed, SealError> {
        self.seal_bytes(plaintext.as_bytes(), recipients)
    }

    /// Seal raw bytes using the OS RNG.
    pub fn seal_bytes(
        &self,
        plaintext: &[u8],
        recipients: &RecipientKeyMap,
    ) -> Result<Sealed, SealError> {
        self.seal_with_rng(plaintext, recipients, &mut OsRng)
    }

    /// Seal raw bytes with a caller-provided CSPRNG.
    ///
    /// # Security
    ///
    /// - A fresh session key and IV are drawn from `rng` on every call
    /// - The same session key is wrapped once per recipient and never reused
    ///   for another envelope
    /// - Caller MUST provide a cryptographically secure RNG in production
    pub fn seal_with_rng<R: RngCore + CryptoRng>(
        &self,
        plaintext: &[u8],
        recipients: &RecipientKeyMap,
        rng: &mut R,
    ) -> Result<Sealed, SealError> {
        let mut session_key = Zeroizing::new([0u8; SESSION_KEY_LEN]);
        rng.fill_bytes(session_key.as_mut_slice());

        let mut iv = [0u8; IV_LEN];
        rng.fill_bytes(&mut iv);

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(session_key.as_slice()));
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&iv), plaintext)
            .map_err(|_| SealError::EncryptFailed)?;

        let mut wrapped_keys = Vec::with_capacity(recipients.with_keys());
        let mut missing = Vec::new();

        for (recipient, key) in recipients.iter() {
            let Some(key) = key else {
                missing.push(recipient.clone());
                continue;
            };

            let wrapped = key
                .wrap(&mut *rng, session_key.as_slice())
                .map_err(|_| SealError::WrapFailed { recipient: recipient.clone() })?;

            wrapped_keys
                .push(WrappedKey { recipient: recipient.clone(), blob: codec::encode_key(&wrapped) });
        }

        debug_assert_eq!(wrapped_keys.len() + missing.len(), recipients.len());

        let coverage =
            KeyCoverage { requested: recipients.len(), with_keys: wrapped_keys.len(), missing };

        tracing::debug!(
            requested = coverage.requested,
            with_keys = coverage.with_keys,
            body_len = plaintext.len(),
            "sealed envelope"
        );

        Ok(Sealed {
            envelope: Envelope { ciphertext_blob: codec::encode(&iv, &ciphertext), wrapped_keys },
            coverage,
        })
    }

    /// Open an envelope as `self_id` and decode the body as UTF-8 text.
    ///
    /// Authenticated bytes that are not valid UTF-8 are reported as
    /// `DecryptFailed`: they cannot have come from [`Self::seal`].
    pub fn open(
        &self,
        envelope: &Envelope,
        self_id: &RecipientId,
        private_key: &PrivateKey,
    ) -> Result<String, OpenError> {
        let bytes = self.open_bytes(envelope, self_id, private_key)?;
        String::from_utf8(bytes).map_err(|_| {
            tracing::debug!(kind = "decrypt_failed", "opened body is not valid UTF-8");
            OpenError::DecryptFailed
        })
    }

    /// Open an envelope as `self_id`, returning the raw body.
    ///
    /// # Errors
    ///
    /// - `NoMatchingRecipient`: no wrapped key for `self_id` (includes
    ///   envelopes with no wrapped keys at all)
    /// - `UnwrapFailed`: the wrapped key does not decrypt under `private_key`
    /// - `MalformedEnvelope`: the ciphertext blob violates the codec
    /// - `DecryptFailed`: authentication tag mismatch (tamper or wrong key)
    pub fn open_bytes(
        &self,
        envelope: &Envelope,
        self_id: &RecipientId,
        private_key: &PrivateKey,
    ) -> Result<Vec<u8>, OpenError> {
        let result = Self::open_inner(envelope, self_id, private_key);
        if let Err(err) = &result {
            tracing::debug!(
                recipient = %self_id,
                kind = err.kind(),
                entries = envelope.wrapped_keys.len(),
                "failed to open envelope"
            );
        }
        result
    }

    fn open_inner(
        envelope: &Envelope,
        self_id: &RecipientId,
        private_key: &PrivateKey,
    ) -> Result<Vec<u8>, OpenError> {
        let entry = envelope.wrapped_key_for(self_id).ok_or(OpenError::NoMatchingRecipient)?;

        let wrapped = codec::decode_key(&entry.blob).map_err(|_| OpenError::UnwrapFailed)?;
        let session_key =
            private_key.unwrap_session_key(&wrapped).map_err(|_| OpenError::UnwrapFailed)?;
        if session_key.len() != SESSION_KEY_LEN {
            return Err(OpenError::UnwrapFailed);
        }

        let (iv, ciphertext) = codec::decode(&envelope.ciphertext_blob)?;

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&session_key));
        cipher
            .decrypt(Nonce::from_slice(&iv), ciphertext.as_slice())
            .map_err(|_| OpenError::DecryptFailed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;
    use crate::{codec::TAG_LEN, keys::KeyPair};

    static ALICE: LazyLock<KeyPair> = LazyLock::new(|| {
        KeyPair::generate_with_rng(&mut ChaCha20Rng::seed_from_u64(1)).unwrap()
    });

    static BOB: LazyLock<KeyPair> = LazyLock::new(|| {
        KeyPair::generate_with_rng(&mut ChaCha20Rng::seed_from_u64(2)).unwrap()
    });

    fn recipients() -> RecipientKeyMap {
        let mut map = RecipientKeyMap::new();
        map.insert("alice", ALICE.public().clone());
        map.insert("bob", BOB.public().clone());
        map
    }

    #[test]
    fn seal_open_roundtrip() {
        let cipher = HybridCipher::new();
        let sealed = cipher.seal("Hello, World!", &recipients()).unwrap();

        let opened = cipher.open(&sealed.envelope, &"alice".into(), ALICE.private()).unwrap();
        assert_eq!(opened, "Hello, World!");
    }

    #[test]
    fn ciphertext_is_iv_plus_plaintext_plus_tag() {
        let cipher = HybridCipher::new();
        let plaintext = b"test message";
        let sealed = cipher.seal_bytes(plaintext, &recipients()).unwrap();

        let (_, ciphertext) = codec::decode(&sealed.envelope.ciphertext_blob).unwrap();
        assert_eq!(ciphertext.len(), plaintext.len() + TAG_LEN);
    }

    #[test]
    fn one_entry_per_recipient_in_id_order() {
        let sealed = HybridCipher::new().seal("hi", &recipients()).unwrap();

        let ids: Vec<&str> = sealed.envelope.recipients().map(RecipientId::as_str).collect();
        assert_eq!(ids, vec!["alice", "bob"]);
        assert!(sealed.coverage.is_complete());
    }

    #[test]
    fn wrapped_keys_differ_per_recipient() {
        let sealed = HybridCipher::new().seal("hi", &recipients()).unwrap();
        let keys = &sealed.envelope.wrapped_keys;

        assert_ne!(keys[0].blob, keys[1].blob);
    }

    #[test]
    fn missing_recipients_are_reported_not_wrapped() {
        let mut map = recipients();
        map.insert_missing("carol");

        let sealed = HybridCipher::new().seal("hi", &map).unwrap();

        assert_eq!(sealed.envelope.wrapped_keys.len(), 2);
        assert_eq!(
            sealed.coverage,
            KeyCoverage { requested: 3, with_keys: 2, missing: vec![RecipientId::new("carol")] }
        );
        assert!(!sealed.coverage.is_complete());
        assert!(!sealed.coverage.is_empty());
    }

    #[test]
    fn empty_recipients_seal_succeeds() {
        let sealed = HybridCipher::new().seal("hi", &RecipientKeyMap::new()).unwrap();

        assert!(sealed.envelope.wrapped_keys.is_empty());
        assert!(sealed.coverage.is_empty());
        assert!(sealed.coverage.is_complete());
    }

    #[test]
    fn seeded_rng_is_deterministic_for_body() {
        let cipher = HybridCipher::new();
        let map = RecipientKeyMap::new();

        let a = cipher.seal_with_rng(b"same", &map, &mut ChaCha20Rng::seed_from_u64(9)).unwrap();
        let b = cipher.seal_with_rng(b"same", &map, &mut ChaCha20Rng::seed_from_u64(9)).unwrap();

        assert_eq!(a.envelope.ciphertext_blob, b.envelope.ciphertext_blob);
    }

    #[test]
    fn wrong_identity_is_no_matching_recipient() {
        let sealed = HybridCipher::new().seal("hi", &recipients()).unwrap();

        let result = HybridCipher::new().open(&sealed.envelope, &"mallory".into(), ALICE.private());
        assert_eq!(result, Err(OpenError::NoMatchingRecipient));
    }

    #[test]
    fn wrong_private_key_fails_unwrap() {
        let sealed = HybridCipher::new().seal("hi", &recipients()).unwrap();

        let result = HybridCipher::new().open(&sealed.envelope, &"alice".into(), BOB.private());
        assert_eq!(result, Err(OpenError::UnwrapFailed));
    }

    #[test]
    fn corrupted_wrapped_key_encoding_fails_unwrap() {
        let mut sealed = HybridCipher::new().seal("hi", &recipients()).unwrap();
        sealed.envelope.wrapped_keys[0].blob = "***".to_string();

        let result = HybridCipher::new().open(&sealed.envelope, &"alice".into(), ALICE.private());
        assert_eq!(result, Err(OpenError::UnwrapFailed));
    }

    #[test]
    fn wrapped_key_of_wrong_length_fails_unwrap() {
        let mut sealed = HybridCipher::new().seal("hi", &recipients()).unwrap();
        let short = ALICE.public().wrap(&mut OsRng, &[0u8; 16]).unwrap();
        sealed.envelope.wrapped_keys[0].blob = codec::encode_key(&short);

        let result = HybridCipher::new().open(&sealed.envelope, &"alice".into(), ALICE.private());
        assert_eq!(result, Err(OpenError::UnwrapFailed));
    }

    #[test]
    fn tampered_body_fails_decrypt() {
        let mut sealed = HybridCipher::new().seal("original message", &recipients()).unwrap();
        let (iv, mut ciphertext) = codec::decode(&sealed.envelope.ciphertext_blob).unwrap();
        ciphertext[0] ^= 0xFF;
        sealed.envelope.ciphertext_blob = codec::encode(&iv, &ciphertext);

        let result = HybridCipher::new().open(&sealed.envelope, &"alice".into(), ALICE.private());
        assert_eq!(result, Err(OpenError::DecryptFailed));
    }

    #[test]
    fn truncated_body_is_malformed() {
        let mut sealed = HybridCipher::new().seal("hi", &recipients()).unwrap();
        sealed.envelope.ciphertext_blob = codec::encode_key(&[0u8; 4]);

        let result = HybridCipher::new().open(&sealed.envelope, &"alice".into(), ALICE.private());
        assert!(matches!(result, Err(OpenError::MalformedEnvelope(_))));
    }

    #[test]
    fn non_utf8_body_fails_text_open_but_not_byte_open() {
        let cipher = HybridCipher::new();
        let sealed = cipher.seal_bytes(&[0xFF, 0xFE, 0xFD], &recipients()).unwrap();

        let text = cipher.open(&sealed.envelope, &"alice".into(), ALICE.private());
        assert_eq!(text, Err(OpenError::DecryptFailed));

        let bytes = cipher.open_bytes(&sealed.envelope, &"alice".into(), ALICE.private()).unwrap();
        assert_eq!(bytes, vec![0xFF, 0xFE, 0xFD]);
    }

    #[test]
    fn insert_encoded_parses_published_key() {
        let mut map = RecipientKeyMap::new();
        map.insert_encoded("alice", &ALICE.public().to_base64()).unwrap();

        assert_eq!(map.len(), 1);
        assert_eq!(map.with_keys(), 1);
    }

    #[test]
    fn insert_encoded_rejects_garbage() {
        let mut map = RecipientKeyMap::new();
        assert_eq!(map.insert_encoded("alice", "garbage"), Err(KeyError::InvalidPublicKey));
        assert!(map.is_empty());
    }

    #[test]
    fn reinserting_recipient_replaces_entry() {
        let mut map = RecipientKeyMap::new();
        map.insert_missing("alice");
        map.insert("alice", ALICE.public().clone());

        assert_eq!(map.len(), 1);
        assert_eq!(map.with_keys(), 1);
    }
}
