//! RSA-OAEP identity keys.
//!
//! One key pair per installation. The public half is published as base64
//! SubjectPublicKeyInfo DER; the private half is only ever encoded as PKCS#8
//! DER for the local key store and never crosses the network.

use std::fmt;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use rand::{CryptoRng, RngCore, rngs::OsRng};
use rsa::{
    Oaep, RsaPrivateKey, RsaPublicKey,
    pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey},
    traits::PublicKeyParts,
};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::KeyError;

/// Modulus size for freshly generated identities.
pub const MODULUS_BITS: usize = 2048;

/// Smallest modulus accepted on import.
pub const MIN_MODULUS_BITS: usize = 2048;

/// Size of a key fingerprint (SHA-256 over the SPKI DER).
pub const FINGERPRINT_SIZE: usize = 32;

fn check_modulus(key: &RsaPublicKey) -> Result<(), KeyError> {
    let bits = key.n().bits();
    if bits < MIN_MODULUS_BITS {
        return Err(KeyError::WeakKey { bits, min: MIN_MODULUS_BITS });
    }
    Ok(())
}

/// A recipient's public key, used to wrap session keys.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey {
    inner: RsaPublicKey,
}

impl PublicKey {
    /// Parse a DER-encoded SubjectPublicKeyInfo.
    pub fn from_der(der: &[u8]) -> Result<Self, KeyError> {
        let inner = RsaPublicKey::from_public_key_der(der).map_err(|_| KeyError::InvalidPublicKey)?;
        check_modulus(&inner)?;
        Ok(Self { inner })
    }

    /// Parse the base64 transport form produced by [`Self::to_base64`].
    pub fn from_base64(encoded: &str) -> Result<Self, KeyError> {
        let der = BASE64.decode(encoded.trim()).map_err(|_| KeyError::InvalidPublicKey)?;
        Self::from_der(&der)
    }

    /// DER-encoded SubjectPublicKeyInfo.
    pub fn to_der(&self) -> Vec<u8> {
        let Ok(doc) = self.inner.to_public_key_der() else {
            unreachable!("a validated RSA public key always has an SPKI encoding");
        };
        doc.as_bytes().to_vec()
    }

    /// Base64 of the SPKI DER, suitable for publishing in a user profile.
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.to_der())
    }

    /// Hex-encoded SHA-256 of the SPKI DER.
    ///
    /// Lets two users compare identities out of band.
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(self.to_der()))
    }

    /// Modulus size in bits.
    pub fn modulus_bits(&self) -> usize {
        self.inner.n().bits()
    }

    /// Encrypt a session key under this public key with RSA-OAEP/SHA-256.
    pub(crate) fn wrap<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        session_key: &[u8],
    ) -> Result<Vec<u8>, rsa::Error> {
        self.inner.encrypt(rng, Oaep::new::<Sha256>(), session_key)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey").field("fingerprint", &self.fingerprint()).finish()
    }
}

/// The local private key. Never leaves the device.
///
/// Read-only once loaded, so a single instance can be shared by reference
/// across concurrent `open` calls.
#[derive(Clone)]
pub struct PrivateKey {
    inner: RsaPrivateKey,
}

impl PrivateKey {
    /// Parse a PKCS#8 DER document written by [`Self::to_pkcs8_der`].
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self, KeyError> {
        let inner = RsaPrivateKey::from_pkcs8_der(der).map_err(|_| KeyError::InvalidPrivateKey)?;
        inner.validate().map_err(|_| KeyError::InvalidPrivateKey)?;
        check_modulus(&inner.to_public_key())?;
        Ok(Self { inner })
    }

    /// PKCS#8 DER encoding for local persistence. Zeroized on drop.
    pub fn to_pkcs8_der(&self) -> Zeroizing<Vec<u8>> {
        let Ok(doc) = self.inner.to_pkcs8_der() else {
            unreachable!("a validated RSA private key always has a PKCS#8 encoding");
        };
        Zeroizing::new(doc.as_bytes().to_vec())
    }

    /// The matching public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey { inner: self.inner.to_public_key() }
    }

    /// Recover a wrapped session key. Uses blinding against timing attacks.
    pub(crate) fn unwrap_session_key(&self, wrapped: &[u8]) -> Result<Zeroizing<Vec<u8>>, rsa::Error> {
        self.inner
            .decrypt_blinded(&mut OsRng, Oaep::new::<Sha256>(), wrapped)
            .map(Zeroizing::new)
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// The local identity: a private key and its public half.
#[derive(Clone, Debug)]
pub struct KeyPair {
    private: PrivateKey,
    public: PublicKey,
}

impl KeyPair {
    /// Generate a fresh identity from the OS RNG.
    pub fn generate() -> Result<Self, KeyError> {
        Self::generate_with_rng(&mut OsRng)
    }

    /// Generate a fresh identity from a caller-provided CSPRNG.
    ///
    /// Callers MUST pass a cryptographically secure RNG in production. Seeded
    /// RNGs are for tests only.
    pub fn generate_with_rng<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self, KeyError> {
        let inner = RsaPrivateKey::new(rng, MODULUS_BITS).map_err(|_| KeyError::Generation)?;
        Ok(Self::from_private(PrivateKey { inner }))
    }

    /// Rebuild the pair from a loaded private key.
    pub fn from_private(private: PrivateKey) -> Self {
        let public = private.public_key();
        Self { private, public }
    }

    /// Public half, for publication.
    pub fn public(&self) -> &PublicKey {
        &self.public
    }

    /// Private half, for local decryption only.
    pub fn private(&self) -> &PrivateKey {
        &self.private
    }

    /// Consume the pair, keeping only the private key.
    pub fn into_private(self) -> PrivateKey {
        self.private
    }
}
