//! Identity lifecycle against durable storage
//!
//! Registration flow as the application drives it: generate, publish,
//! persist, restart, load, decrypt.

use hush_crypto::{HybridCipher, PublicKey, RecipientKeyMap};
use hush_keystore::{IDENTITY_RECORD_ID, KeyPairStore, KeyStorage, RedbStorage, StorageError};
use tempfile::tempdir;

#[test]
fn fresh_install_has_no_identity() {
    let dir = tempdir().unwrap();
    let store = KeyPairStore::new(RedbStorage::open(dir.path().join("identity.redb")).unwrap());

    assert!(store.load_private().unwrap().is_none());
}

#[test]
fn identity_survives_restart_and_decrypts() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("identity.redb");

    let published = {
        let store = KeyPairStore::new(RedbStorage::open(&path).unwrap());
        let pair = store.generate().unwrap();
        let published = store.export_public(pair.public());
        store.persist_private(pair.private()).unwrap();
        published
    };

    // Someone else seals to the published key while we are offline.
    let mut recipients = RecipientKeyMap::new();
    recipients.insert_encoded("alice", &published).unwrap();
    let sealed = HybridCipher::new().seal("see you at noon", &recipients).unwrap();
    assert!(sealed.coverage.is_complete());

    let store = KeyPairStore::new(RedbStorage::open(&path).unwrap());
    let pair = store.load_private().unwrap().unwrap();

    assert_eq!(*pair.public(), PublicKey::from_base64(&published).unwrap());
    let plaintext = HybridCipher::new().open(&sealed.envelope, &"alice".into(), pair.private()).unwrap();
    assert_eq!(plaintext, "see you at noon");
}

#[test]
fn persist_is_idempotent() {
    let dir = tempdir().unwrap();
    let store = KeyPairStore::new(RedbStorage::open(dir.path().join("identity.redb")).unwrap());
    let pair = store.generate().unwrap();

    store.persist_private(pair.private()).unwrap();
    let first = store.storage().get(IDENTITY_RECORD_ID).unwrap().unwrap();

    store.persist_private(pair.private()).unwrap();
    let second = store.storage().get(IDENTITY_RECORD_ID).unwrap().unwrap();

    assert_eq!(first, second);
    assert_eq!(store.load_private().unwrap().unwrap().public(), pair.public());
}

#[test]
fn overwrite_replaces_identity() {
    let dir = tempdir().unwrap();
    let store = KeyPairStore::new(RedbStorage::open(dir.path().join("identity.redb")).unwrap());
    let old = store.generate().unwrap();
    let new = store.generate().unwrap();

    store.persist_private(old.private()).unwrap();
    store.persist_private(new.private()).unwrap();

    assert_eq!(store.load_private().unwrap().unwrap().public(), new.public());
}

#[test]
fn corrupted_record_is_an_error() {
    let dir = tempdir().unwrap();
    let storage = RedbStorage::open(dir.path().join("identity.redb")).unwrap();
    storage.put(IDENTITY_RECORD_ID, &[0xff, 0x00, 0x13, 0x37]).unwrap();

    let store = KeyPairStore::new(storage);

    assert!(store.has_identity().unwrap());
    let err = store.load_private().unwrap_err();
    assert!(matches!(err, StorageError::Corrupted(_)));
    assert!(!err.is_transient());
}

#[test]
fn wipe_survives_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("identity.redb");

    {
        let store = KeyPairStore::new(RedbStorage::open(&path).unwrap());
        let pair = store.generate().unwrap();
        store.persist_private(pair.private()).unwrap();
        assert!(store.wipe().unwrap());
    }

    let store = KeyPairStore::new(RedbStorage::open(&path).unwrap());
    assert!(store.load_private().unwrap().is_none());
}
