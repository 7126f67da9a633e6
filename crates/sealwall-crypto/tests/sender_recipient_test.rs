//! Two-device scenarios: a sender that only knows the published public key
//! and the recipient that generated the pair.

use std::sync::Arc;

use sealwall_core::{KeySlot, KeyStore, MemoryKeyStore, Record};
use sealwall_crypto::{
    decrypt_all, CryptoError, EncryptionService, KeyManager, LengthRecovery,
};

struct Fleet {
    recipient: EncryptionService,
    sender: EncryptionService,
}

fn fleet() -> Fleet {
    let recipient_keys = KeyManager::rsa(Arc::new(MemoryKeyStore::new()));
    let (_, encoded) = recipient_keys.generate_and_persist().unwrap();

    let sender_keys = KeyManager::rsa(Arc::new(MemoryKeyStore::new()))
        .with_public_override(Some(encoded.public.clone()));

    Fleet {
        recipient: EncryptionService::new(recipient_keys, LengthRecovery::BlockAligned),
        sender: EncryptionService::new(sender_keys, LengthRecovery::BlockAligned),
    }
}

#[test]
fn sender_encrypts_recipient_reads() {
    let fleet = fleet();

    let long = "long ".repeat(100);
    let records: Vec<Record> = ["hello", "second note", long.as_str()]
        .iter()
        .map(|m| fleet.sender.encrypt_for_recipient(m).unwrap())
        .collect();

    assert_eq!(records[0].len(), 8);
    let entries = decrypt_all(&fleet.recipient, &records, 2).unwrap();
    assert_eq!(entries[0].result.as_ref().unwrap(), "hello");
    assert_eq!(entries[1].result.as_ref().unwrap(), "second note");
    assert_eq!(entries[2].result.as_ref().unwrap(), &long);
}

#[test]
fn sender_cannot_decrypt_its_own_records() {
    let fleet = fleet();
    let record = fleet.sender.encrypt_for_recipient("one way").unwrap();

    let err = fleet.sender.decrypt_as_recipient(&record).unwrap_err();
    assert!(matches!(err, CryptoError::NoPrivateKey));
    assert!(!fleet.sender.keys().has_private().unwrap());
}

#[test]
fn records_survive_hex_transport() {
    let fleet = fleet();
    let record = fleet.sender.encrypt_for_recipient("over the wire").unwrap();

    let json = serde_json::to_string(&record).unwrap();
    let parsed: Record = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, record);

    let from_lines = Record::from_hex_words(&record.to_hex_lines()).unwrap();
    assert_eq!(fleet.recipient.decrypt_as_recipient(&from_lines).unwrap(), "over the wire");
}

#[test]
fn public_key_published_by_recipient_matches_store() {
    let store = Arc::new(MemoryKeyStore::new());
    let keys = KeyManager::rsa(store.clone());
    let (pair, encoded) = keys.generate_and_persist().unwrap();

    assert_eq!(store.get(KeySlot::Public).unwrap().as_deref(), Some(encoded.public.as_str()));
    let loaded = keys.load_public().unwrap().unwrap();
    assert_eq!(
        keys.fingerprint(&loaded).unwrap(),
        keys.fingerprint(pair.public()).unwrap()
    );
}
