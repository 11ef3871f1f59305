//! Fuzz target for opening tampered envelopes
//!
//! Seals a message for two fixed identities, applies an arbitrary sequence of
//! mutations to the envelope, then opens it as each identity.
//!
//! # Invariants
//!
//! - `open` NEVER panics
//! - `open` never returns plaintext other than the sealed message
//! - An unmodified envelope always opens for every recipient

#![no_main]

use std::sync::LazyLock;

use arbitrary::Arbitrary;
use hush_crypto::{Envelope, HybridCipher, KeyPair, RecipientId, RecipientKeyMap, WrappedKey};
use libfuzzer_sys::fuzz_target;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

static IDENTITIES: LazyLock<[KeyPair; 2]> = LazyLock::new(|| {
    let mut rng = ChaCha20Rng::seed_from_u64(0x6875_7368);
    [
        KeyPair::generate_with_rng(&mut rng).expect("keygen"),
        KeyPair::generate_with_rng(&mut rng).expect("keygen"),
    ]
});

const IDS: [&str; 2] = ["alice", "bob"];

#[derive(Debug, Arbitrary)]
struct Scenario {
    message: String,
    mutations: Vec<Mutation>,
}

#[derive(Debug, Arbitrary)]
enum Mutation {
    /// Replace one byte of the body
    BodyByte { index: u16, byte: u8 },
    /// Truncate the body
    TruncateBody { len: u16 },
    /// Replace one byte of a wrapped key
    KeyByte { entry: u8, index: u16, byte: u8 },
    /// Exchange the wrapped keys of the two entries
    SwapKeys,
    /// Rename an entry's recipient
    Readdress { entry: u8, to_bob: bool },
    /// Drop an entry
    DropEntry { entry: u8 },
    /// Append an arbitrary entry
    Inject { to_bob: bool, blob: String },
}

/// Envelope under mutation. Strings are held as raw bytes so truncation and
/// byte replacement never split a character.
struct Draft {
    body: Vec<u8>,
    entries: Vec<(RecipientId, Vec<u8>)>,
}

impl Draft {
    fn from_envelope(envelope: &Envelope) -> Self {
        Self {
            body: envelope.ciphertext_blob.clone().into_bytes(),
            entries: envelope
                .wrapped_keys
                .iter()
                .map(|entry| (entry.recipient.clone(), entry.blob.clone().into_bytes()))
                .collect(),
        }
    }

    fn into_envelope(self) -> Envelope {
        Envelope {
            ciphertext_blob: String::from_utf8_lossy(&self.body).into_owned(),
            wrapped_keys: self
                .entries
                .into_iter()
                .map(|(recipient, blob)| WrappedKey {
                    recipient,
                    blob: String::from_utf8_lossy(&blob).into_owned(),
                })
                .collect(),
        }
    }
}

fn replace_byte(bytes: &mut [u8], index: u16, byte: u8) {
    if !bytes.is_empty() {
        let idx = index as usize % bytes.len();
        bytes[idx] = byte;
    }
}

fn apply(draft: &mut Draft, mutation: &Mutation) {
    let entries = draft.entries.len();

    match mutation {
        Mutation::BodyByte { index, byte } => replace_byte(&mut draft.body, *index, *byte),
        Mutation::TruncateBody { len } => {
            let len = *len as usize % (draft.body.len() + 1);
            draft.body.truncate(len);
        },
        Mutation::KeyByte { entry, index, byte } if entries > 0 => {
            replace_byte(&mut draft.entries[*entry as usize % entries].1, *index, *byte);
        },
        Mutation::SwapKeys if entries >= 2 => {
            let first = std::mem::take(&mut draft.entries[0].1);
            draft.entries[0].1 = std::mem::replace(&mut draft.entries[1].1, first);
        },
        Mutation::Readdress { entry, to_bob } if entries > 0 => {
            draft.entries[*entry as usize % entries].0 = RecipientId::new(IDS[usize::from(*to_bob)]);
        },
        Mutation::DropEntry { entry } if entries > 0 => {
            draft.entries.remove(*entry as usize % entries);
        },
        Mutation::Inject { to_bob, blob } => {
            draft
                .entries
                .push((RecipientId::new(IDS[usize::from(*to_bob)]), blob.clone().into_bytes()));
        },
        _ => {},
    }
}

fuzz_target!(|scenario: Scenario| {
    let cipher = HybridCipher::new();

    let recipients: RecipientKeyMap = IDS
        .iter()
        .zip(IDENTITIES.iter())
        .map(|(id, pair)| (RecipientId::new(*id), pair.public().clone()))
        .collect();

    let sealed = cipher.seal(&scenario.message, &recipients).expect("seal");
    let original = sealed.envelope.clone();

    let mut draft = Draft::from_envelope(&sealed.envelope);
    for mutation in &scenario.mutations {
        apply(&mut draft, mutation);
    }
    let envelope = draft.into_envelope();

    for (id, pair) in IDS.iter().zip(IDENTITIES.iter()) {
        let self_id = RecipientId::new(*id);

        if let Ok(plaintext) = cipher.open(&envelope, &self_id, pair.private()) {
            assert_eq!(plaintext, scenario.message, "open returned foreign plaintext");
        }

        if envelope == original {
            assert_eq!(
                cipher.open(&envelope, &self_id, pair.private()).as_deref(),
                Ok(scenario.message.as_str()),
            );
        }
    }
});
