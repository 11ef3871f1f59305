//! Subcommand implementations.
//!
//! Each command writes its result to `out` so tests can run them against
//! in-memory storage and a byte buffer. `seal` writes only the wire envelope
//! to `out`, so its output feeds `open` unchanged; the coverage report goes
//! to a separate diagnostics writer.

use std::io::Write;

use hush_crypto::{Envelope, HybridCipher, RecipientId, RecipientKeyMap};
use hush_keystore::{KeyPairStore, KeyStorage};
use serde::Serialize;

use crate::error::CliError;

/// Printed instead of plaintext when an envelope cannot be opened.
pub const UNAVAILABLE: &str = "message unavailable";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CoverageReport<'a> {
    requested: usize,
    with_keys: usize,
    missing: &'a [RecipientId],
    complete: bool,
}

/// Generate and persist a new identity, then print its public key.
pub fn init<S: KeyStorage>(
    store: &KeyPairStore<S>,
    force: bool,
    out: &mut impl Write,
) -> Result<(), CliError> {
    if store.has_identity()? && !force {
        return Err(CliError::IdentityExists);
    }

    let pair = store.generate()?;
    store.persist_private(pair.private())?;

    writeln!(out, "{}", store.export_public(pair.public()))?;
    Ok(())
}

/// Print the local public key, or its fingerprint.
pub fn public_key<S: KeyStorage>(
    store: &KeyPairStore<S>,
    fingerprint: bool,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let pair = store.load_private()?.ok_or(CliError::NoIdentity)?;

    if fingerprint {
        writeln!(out, "{}", pair.public().fingerprint())?;
    } else {
        writeln!(out, "{}", store.export_public(pair.public()))?;
    }
    Ok(())
}

/// Seal `message`, printing the wire envelope JSON to `out` and the
/// coverage report JSON to `diag`.
///
/// `to` pairs a recipient id with their published base64 key. `missing`
/// names recipients without a key; they are reported but cannot read the
/// message.
pub fn seal(
    to: &[(String, String)],
    missing: &[String],
    message: &str,
    out: &mut impl Write,
    diag: &mut impl Write,
) -> Result<(), CliError> {
    let mut recipients = RecipientKeyMap::new();
    for (recipient, key) in to {
        recipients
            .insert_encoded(recipient.as_str(), key)
            .map_err(|source| CliError::RecipientKey { recipient: recipient.clone(), source })?;
    }
    for recipient in missing {
        recipients.insert_missing(recipient.as_str());
    }

    let sealed = HybridCipher::new().seal(message, &recipients)?;

    if sealed.coverage.is_empty() {
        tracing::warn!("no recipient has a published key; nobody can open this message");
    } else if !sealed.coverage.is_complete() {
        tracing::warn!(
            missing = sealed.coverage.missing.len(),
            "some recipients have no published key"
        );
    }

    serde_json::to_writer(&mut *out, &sealed.envelope)?;
    writeln!(out)?;

    let coverage = CoverageReport {
        requested: sealed.coverage.requested,
        with_keys: sealed.coverage.with_keys,
        missing: &sealed.coverage.missing,
        complete: sealed.coverage.is_complete(),
    };
    serde_json::to_writer(&mut *diag, &coverage)?;
    writeln!(diag)?;
    Ok(())
}

/// Open an envelope as `self_id`.
///
/// Prints the plaintext and returns `true`, or prints [`UNAVAILABLE`] and
/// returns `false`. A missing or unreadable identity is an error, not an
/// unavailable message.
pub fn open<S: KeyStorage>(
    store: &KeyPairStore<S>,
    self_id: &str,
    envelope_json: &str,
    out: &mut impl Write,
) -> Result<bool, CliError> {
    let pair = store.load_private()?.ok_or(CliError::NoIdentity)?;

    let plaintext = serde_json::from_str::<Envelope>(envelope_json)
        .inspect_err(|e| tracing::debug!(error = %e, "envelope is not valid JSON"))
        .ok()
        .and_then(|envelope| {
            HybridCipher::new().open(&envelope, &RecipientId::new(self_id), pair.private()).ok()
        });

    match plaintext {
        Some(text) => {
            writeln!(out, "{text}")?;
            Ok(true)
        },
        None => {
            writeln!(out, "{UNAVAILABLE}")?;
            Ok(false)
        },
    }
}

/// Delete the local identity.
pub fn wipe<S: KeyStorage>(store: &KeyPairStore<S>, out: &mut impl Write) -> Result<(), CliError> {
    if store.wipe()? {
        writeln!(out, "local identity wiped")?;
    } else {
        writeln!(out, "no local identity")?;
    }
    Ok(())
}
