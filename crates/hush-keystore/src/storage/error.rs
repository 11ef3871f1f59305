//! Storage error types.
//!
//! Defines errors that can occur during storage operations:
//! - `Io`: the underlying store is unavailable or failed mid-operation
//! - `Corrupted`: a record exists but cannot be decoded
//!
//! Absence of a record is not an error. Lookups return `Ok(None)`.

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// I/O error (file system, database, etc.)
    #[error("I/O error: {0}")]
    Io(String),

    /// A stored record exists but cannot be decoded
    #[error("corrupted record: {0}")]
    Corrupted(String),
}

impl StorageError {
    /// Returns true if retrying the operation may succeed.
    ///
    /// A corrupted record stays corrupted; an unavailable store may recover.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_is_transient() {
        assert!(StorageError::Io("disk full".to_string()).is_transient());
    }

    #[test]
    fn corrupted_is_not_transient() {
        assert!(!StorageError::Corrupted("bad cbor".to_string()).is_transient());
    }

    #[test]
    fn error_display() {
        let err = StorageError::Corrupted("unknown record version 9".to_string());
        assert_eq!(err.to_string(), "corrupted record: unknown record version 9");
    }
}
