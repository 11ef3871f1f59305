//! Redb-backed durable storage implementation.
//!
//! Uses Redb's ACID transactions with Copy-on-Write for crash safety. A
//! record either survives a crash completely or not at all.

use std::{path::Path, sync::Arc};

use redb::{Database, TableDefinition};
use zeroize::Zeroizing;

use super::{KeyStorage, StorageError};

/// Table: records
/// Key: record identifier (UTF-8)
/// Value: opaque record bytes
const RECORDS: TableDefinition<&str, &[u8]> = TableDefinition::new("records");

fn io_err(err: impl std::fmt::Display) -> StorageError {
    StorageError::Io(err.to_string())
}

/// Durable storage backed by Redb.
///
/// Thread-safe through Redb's internal locking. Clone is cheap (Arc).
#[derive(Clone)]
pub struct RedbStorage {
    db: Arc<Database>,
}

impl RedbStorage {
    /// Open or create a Redb database at the given path.
    ///
    /// Creates the RECORDS table if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the database cannot be opened or created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        let txn = db.begin_write().map_err(io_err)?;
        {
            let _ = txn.open_table(RECORDS).map_err(io_err)?;
        }
        txn.commit().map_err(io_err)?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl KeyStorage for RedbStorage {
    fn put(&self, record_id: &str, value: &[u8]) -> Result<(), StorageError> {
        let txn = self.db.begin_write().map_err(io_err)?;

        {
            let mut table = txn.open_table(RECORDS).map_err(io_err)?;
            table.insert(record_id, value).map_err(io_err)?;
        }

        txn.commit().map_err(io_err)?;

        Ok(())
    }

    fn get(&self, record_id: &str) -> Result<Option<Zeroizing<Vec<u8>>>, StorageError> {
        let txn = self.db.begin_read().map_err(io_err)?;
        let table = txn.open_table(RECORDS).map_err(io_err)?;

        match table.get(record_id).map_err(io_err)? {
            Some(value) => Ok(Some(Zeroizing::new(value.value().to_vec()))),
            None => Ok(None),
        }
    }

    fn delete(&self, record_id: &str) -> Result<bool, StorageError> {
        let txn = self.db.begin_write().map_err(io_err)?;

        let existed = {
            let mut table = txn.open_table(RECORDS).map_err(io_err)?;
            table.remove(record_id).map_err(io_err)?.is_some()
        };

        txn.commit().map_err(io_err)?;

        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_get_missing_record() {
        let dir = tempdir().unwrap();
        let storage = RedbStorage::open(dir.path().join("test.redb")).unwrap();

        assert_eq!(storage.get("missing").unwrap(), None);
    }

    #[test]
    fn test_put_get_roundtrip() {
        let dir = tempdir().unwrap();
        let storage = RedbStorage::open(dir.path().join("test.redb")).unwrap();

        storage.put("record", b"hello world").unwrap();

        let loaded = storage.get("record").unwrap().unwrap();
        assert_eq!(loaded.as_slice(), b"hello world");
    }

    #[test]
    fn test_put_overwrite() {
        let dir = tempdir().unwrap();
        let storage = RedbStorage::open(dir.path().join("test.redb")).unwrap();

        storage.put("record", b"first").unwrap();
        storage.put("record", b"second").unwrap();

        let loaded = storage.get("record").unwrap().unwrap();
        assert_eq!(loaded.as_slice(), b"second");
    }

    #[test]
    fn test_delete() {
        let dir = tempdir().unwrap();
        let storage = RedbStorage::open(dir.path().join("test.redb")).unwrap();

        storage.put("record", b"value").unwrap();

        assert!(storage.delete("record").unwrap());
        assert!(!storage.delete("record").unwrap());
        assert_eq!(storage.get("record").unwrap(), None);
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.redb");

        {
            let storage = RedbStorage::open(&path).unwrap();
            storage.put("record", b"durable").unwrap();
        }

        let reopened = RedbStorage::open(&path).unwrap();
        let loaded = reopened.get("record").unwrap().unwrap();
        assert_eq!(loaded.as_slice(), b"durable");
    }

    #[test]
    fn test_open_invalid_path_is_io_error() {
        let dir = tempdir().unwrap();
        let result = RedbStorage::open(dir.path().join("missing-dir").join("test.redb"));

        assert!(matches!(result, Err(StorageError::Io(_))));
    }
}
