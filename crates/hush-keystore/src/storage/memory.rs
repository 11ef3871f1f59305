#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use zeroize::Zeroizing;

use super::{KeyStorage, StorageError};

/// In-memory storage implementation for testing and ephemeral sessions
///
/// Uses a `HashMap` of zeroizing buffers wrapped in Arc<Mutex<>> to allow
/// Clone and concurrent access. Uses `lock().expect()` which will panic if the
/// mutex is poisoned - acceptable for test code. Nothing survives the
/// process.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    records: Arc<Mutex<HashMap<String, Zeroizing<Vec<u8>>>>>,
}

impl MemoryStorage {
    /// Create a new empty `MemoryStorage`
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for test
    /// code.
    #[allow(clippy::expect_used)]
    pub fn record_count(&self) -> usize {
        self.records.lock().expect("Mutex poisoned").len()
    }
}

impl KeyStorage for MemoryStorage {
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for test
    /// code.
    #[allow(clippy::expect_used)]
    fn put(&self, record_id: &str, value: &[u8]) -> Result<(), StorageError> {
        self.records
            .lock()
            .expect("Mutex poisoned")
            .insert(record_id.to_string(), Zeroizing::new(value.to_vec()));

        Ok(())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for test
    /// code.
    #[allow(clippy::expect_used)]
    fn get(&self, record_id: &str) -> Result<Option<Zeroizing<Vec<u8>>>, StorageError> {
        Ok(self.records.lock().expect("Mutex poisoned").get(record_id).cloned())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for test
    /// code.
    #[allow(clippy::expect_used)]
    fn delete(&self, record_id: &str) -> Result<bool, StorageError> {
        Ok(self.records.lock().expect("Mutex poisoned").remove(record_id).is_some())
    }
}
