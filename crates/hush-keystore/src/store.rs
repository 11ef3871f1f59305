//! Local identity lifecycle.
//!
//! [`KeyPairStore`] owns the single identity record of an installation. The
//! record is CBOR with an explicit format version so a future layout can be
//! told apart from a damaged one.

use hush_crypto::{KeyError, KeyPair, PrivateKey, PublicKey};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

use crate::storage::{KeyStorage, StorageError};

/// Fixed identifier of the identity record.
pub const IDENTITY_RECORD_ID: &str = "hush/identity/private-key";

/// Current identity record format.
pub const RECORD_VERSION: u16 = 1;

/// Algorithm label written into every record.
pub const RECORD_ALGORITHM: &str = "rsa-oaep-sha256";

/// On-disk identity record.
#[derive(Serialize, Deserialize)]
struct StoredIdentity {
    version: u16,
    algorithm: String,
    pkcs8_der: Vec<u8>,
}

impl Drop for StoredIdentity {
    fn drop(&mut self) {
        self.pkcs8_der.zeroize();
    }
}

/// Decode an identity record into a key pair.
///
/// Exposed for fuzzing. Any failure is `StorageError::Corrupted`.
pub fn decode_record(bytes: &[u8]) -> Result<KeyPair, StorageError> {
    let record: StoredIdentity = ciborium::de::from_reader(bytes)
        .map_err(|e| StorageError::Corrupted(format!("identity record decode failed: {e}")))?;

    if record.version != RECORD_VERSION {
        return Err(StorageError::Corrupted(format!(
            "unknown identity record version {}",
            record.version
        )));
    }

    if record.algorithm != RECORD_ALGORITHM {
        return Err(StorageError::Corrupted(format!(
            "unsupported identity algorithm {}",
            record.algorithm
        )));
    }

    let private = PrivateKey::from_pkcs8_der(&record.pkcs8_der)
        .map_err(|e| StorageError::Corrupted(format!("identity key rejected: {e}")))?;

    Ok(KeyPair::from_private(private))
}

fn encode_record(key: &PrivateKey) -> Result<Zeroizing<Vec<u8>>, StorageError> {
    let record = StoredIdentity {
        version: RECORD_VERSION,
        algorithm: RECORD_ALGORITHM.to_string(),
        pkcs8_der: key.to_pkcs8_der().to_vec(),
    };

    let mut encoded = Zeroizing::new(Vec::new());
    ciborium::ser::into_writer(&record, &mut *encoded)
        .map_err(|e| StorageError::Io(format!("identity record encode failed: {e}")))?;

    Ok(encoded)
}

/// Generates and persists the local identity.
///
/// Generation and persistence are separate steps so the caller can order
/// them around account registration. `load_private` is expected once per
/// process; the returned [`KeyPair`] is then shared by reference.
///
/// # Invariants
///
/// - At most one identity record exists per installation
/// - `load_private` returns `None` only when no record exists, never when
///   the store is unavailable or the record is damaged
/// - The private key never leaves this store except as a [`KeyPair`]
#[derive(Clone)]
pub struct KeyPairStore<S: KeyStorage> {
    storage: S,
}

impl<S: KeyStorage> KeyPairStore<S> {
    /// Create a store over the given backend.
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Generate a fresh identity. Nothing is written.
    pub fn generate(&self) -> Result<KeyPair, KeyError> {
        let pair = KeyPair::generate()?;
        tracing::info!(fingerprint = %pair.public().fingerprint(), "generated identity");
        Ok(pair)
    }

    /// Encode a public key for publication (base64 SPKI).
    pub fn export_public(&self, key: &PublicKey) -> String {
        key.to_base64()
    }

    /// Write the private key under [`IDENTITY_RECORD_ID`].
    ///
    /// Overwrites any previous identity. Writing the same key twice leaves the
    /// store unchanged.
    pub fn persist_private(&self, key: &PrivateKey) -> Result<(), StorageError> {
        let encoded = encode_record(key)?;

        if let Err(err) = self.storage.put(IDENTITY_RECORD_ID, &encoded) {
            tracing::warn!(error = %err, "failed to persist identity");
            return Err(err);
        }

        tracing::info!(fingerprint = %key.public_key().fingerprint(), "persisted identity");
        Ok(())
    }

    /// Load the persisted identity.
    ///
    /// `Ok(None)` is the normal state of a fresh installation.
    pub fn load_private(&self) -> Result<Option<KeyPair>, StorageError> {
        let bytes = match self.storage.get(IDENTITY_RECORD_ID) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                tracing::debug!("no local identity");
                return Ok(None);
            },
            Err(err) => {
                tracing::warn!(error = %err, "identity store unavailable");
                return Err(err);
            },
        };

        match decode_record(&bytes) {
            Ok(pair) => {
                tracing::debug!(fingerprint = %pair.public().fingerprint(), "loaded identity");
                Ok(Some(pair))
            },
            Err(err) => {
                tracing::warn!(error = %err, "identity record unreadable");
                Err(err)
            },
        }
    }

    /// Whether an identity record exists. Does not validate it.
    pub fn has_identity(&self) -> Result<bool, StorageError> {
        Ok(self.storage.get(IDENTITY_RECORD_ID)?.is_some())
    }

    /// Delete the identity record. Returns whether one existed.
    ///
    /// Everything encrypted to the deleted key becomes unreadable.
    pub fn wipe(&self) -> Result<bool, StorageError> {
        let existed = self.storage.delete(IDENTITY_RECORD_ID)?;
        if existed {
            tracing::info!("wiped local identity");
        }
        Ok(existed)
    }

    /// Underlying storage backend.
    pub fn storage(&self) -> &S {
        &self.storage
    }
}

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;
    use crate::storage::MemoryStorage;

    static IDENTITY: LazyLock<KeyPair> = LazyLock::new(|| {
        KeyPair::generate_with_rng(&mut ChaCha20Rng::seed_from_u64(11)).unwrap()
    });

    fn encoded_with(version: u16, algorithm: &str, pkcs8_der: Vec<u8>) -> Vec<u8> {
        let record = StoredIdentity { version, algorithm: algorithm.to_string(), pkcs8_der };
        let mut encoded = Vec::new();
        ciborium::ser::into_writer(&record, &mut encoded).unwrap();
        encoded
    }

    #[test]
    fn empty_store_loads_none() {
        let store = KeyPairStore::new(MemoryStorage::new());

        assert!(store.load_private().unwrap().is_none());
        assert!(!store.has_identity().unwrap());
    }

    #[test]
    fn persist_then_load() {
        let store = KeyPairStore::new(MemoryStorage::new());
        store.persist_private(IDENTITY.private()).unwrap();

        let loaded = store.load_private().unwrap().unwrap();
        assert_eq!(loaded.public(), IDENTITY.public());
    }

    #[test]
    fn record_lives_under_fixed_id() {
        let store = KeyPairStore::new(MemoryStorage::new());
        store.persist_private(IDENTITY.private()).unwrap();

        assert!(store.storage().get(IDENTITY_RECORD_ID).unwrap().is_some());
        assert_eq!(store.storage().record_count(), 1);
    }

    #[test]
    fn export_public_matches_key_encoding() {
        let store = KeyPairStore::new(MemoryStorage::new());
        let exported = store.export_public(IDENTITY.public());

        assert_eq!(PublicKey::from_base64(&exported).unwrap(), *IDENTITY.public());
    }

    #[test]
    fn unknown_version_is_corrupted() {
        let bytes = encoded_with(9, RECORD_ALGORITHM, IDENTITY.private().to_pkcs8_der().to_vec());

        let err = decode_record(&bytes).unwrap_err();
        assert_eq!(err, StorageError::Corrupted("unknown identity record version 9".to_string()));
    }

    #[test]
    fn unknown_algorithm_is_corrupted() {
        let bytes = encoded_with(RECORD_VERSION, "x25519", IDENTITY.private().to_pkcs8_der().to_vec());

        assert!(matches!(decode_record(&bytes), Err(StorageError::Corrupted(_))));
    }

    #[test]
    fn garbage_key_is_corrupted() {
        let bytes = encoded_with(RECORD_VERSION, RECORD_ALGORITHM, vec![0x30, 0x01, 0x00]);

        assert!(matches!(decode_record(&bytes), Err(StorageError::Corrupted(_))));
    }

    #[test]
    fn garbage_record_is_corrupted_not_absent() {
        let storage = MemoryStorage::new();
        storage.put(IDENTITY_RECORD_ID, b"not cbor at all").unwrap();
        let store = KeyPairStore::new(storage);

        assert!(matches!(store.load_private(), Err(StorageError::Corrupted(_))));
    }

    #[test]
    fn wipe_removes_identity() {
        let store = KeyPairStore::new(MemoryStorage::new());
        store.persist_private(IDENTITY.private()).unwrap();

        assert!(store.wipe().unwrap());
        assert!(!store.wipe().unwrap());
        assert!(store.load_private().unwrap().is_none());
    }
}
