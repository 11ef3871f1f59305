//! Command errors.

use hush_crypto::{KeyError, SealError};
use hush_keystore::StorageError;
use thiserror::Error;

/// Errors that abort a command.
///
/// Failure to open an envelope is not one of these: it is reported as a
/// neutral "message unavailable" result.
#[derive(Error, Debug)]
pub enum CliError {
    /// `init` would replace an existing identity
    #[error("an identity already exists; pass --force to replace it")]
    IdentityExists,

    /// No identity has been created on this installation
    #[error("no local identity; run `hush init` first")]
    NoIdentity,

    /// The identity store failed or holds a damaged record
    #[error("identity store unavailable: {0}")]
    Storage(#[from] StorageError),

    /// A `--to` argument carried an unusable public key
    #[error("invalid public key for {recipient}: {source}")]
    RecipientKey {
        /// Recipient the key was given for
        recipient: String,
        /// Why the key was rejected
        #[source]
        source: KeyError,
    },

    /// Key generation failed
    #[error(transparent)]
    Key(#[from] KeyError),

    /// Sealing failed
    #[error(transparent)]
    Seal(#[from] SealError),

    /// Reading input or writing output failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding the sealed envelope failed
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}
