//! Hush local identity storage
//!
//! Persists the installation's private key and hands it back once per
//! process. Storage is abstracted behind [`KeyStorage`] so the same lifecycle
//! runs against redb on disk, an in-memory map in tests, or a fault-injecting
//! wrapper in chaos tests.
//!
//! # Limitations
//!
//! One identity per installation. There is no export, backup or sync: a user
//! who signs in on a new device starts with [`KeyPairStore::load_private`]
//! returning `None`, and messages encrypted to the old key stay unreadable
//! there.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod storage;
mod store;

pub use storage::{ChaoticStorage, KeyStorage, MemoryStorage, RedbStorage, StorageError};
pub use store::{
    IDENTITY_RECORD_ID, KeyPairStore, RECORD_ALGORITHM, RECORD_VERSION, decode_record,
};
