//! Fuzz target for identity record decoding
//!
//! A damaged identity record must be reported, never crash the process and
//! never be confused with "no identity".
//!
//! # Invariants
//!
//! - `decode_record` NEVER panics
//! - Every rejection is `StorageError::Corrupted`

#![no_main]

use hush_keystore::{StorageError, decode_record};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Err(err) = decode_record(data) {
        assert!(matches!(err, StorageError::Corrupted(_)), "unexpected error: {err:?}");
    }
});
