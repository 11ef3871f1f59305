//! Fuzz target for envelope decoding
//!
//! Feeds arbitrary bytes to the body codec and the JSON envelope parser.
//!
//! # Invariants
//!
//! - Decoding NEVER panics
//! - Decoding is canonical: re-encoding a decoded body reproduces the input

#![no_main]

use hush_crypto::{Envelope, codec};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = serde_json::from_slice::<Envelope>(data);

    let Ok(blob) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok((iv, ciphertext)) = codec::decode(blob) {
        assert_eq!(codec::encode(&iv, &ciphertext), blob, "decode accepted a non-canonical body");
    }

    let _ = codec::decode_key(blob);
});
