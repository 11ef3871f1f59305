//! Storage abstraction for local key records
//!
//! Trait-based abstraction over a durable key-value store. The trait is
//! synchronous (no async): records are tiny and written once per
//! installation.

mod chaotic;
mod error;
mod memory;
mod redb;

pub use chaotic::ChaoticStorage;
pub use error::StorageError;
pub use memory::MemoryStorage;
use zeroize::Zeroizing;

pub use self::redb::RedbStorage;

/// Storage abstraction for opaque key records
///
/// Must be Clone (shared between the identity store and diagnostics), Send +
/// Sync (thread-safe), and synchronous. Implementations typically share
/// internal state via Arc, so clones access the same underlying storage.
///
/// Values may hold private key material; implementations return them in
/// zeroizing buffers.
pub trait KeyStorage: Clone + Send + Sync + 'static {
    /// Store a record, replacing any previous value under `record_id`.
    ///
    /// # Invariants
    ///
    /// - Post: a subsequent `get(record_id)` returns exactly `value`
    /// - Writing the same value twice is indistinguishable from writing once
    fn put(&self, record_id: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Load a record. `None` if nothing was ever stored under `record_id`.
    fn get(&self, record_id: &str) -> Result<Option<Zeroizing<Vec<u8>>>, StorageError>;

    /// Remove a record.
    ///
    /// Returns whether a record existed. Deleting a missing record is not an
    /// error.
    fn delete(&self, record_id: &str) -> Result<bool, StorageError>;
}
