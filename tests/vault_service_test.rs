//! Integration tests for VaultService: envelope round trip and node encryption.

use std::sync::Arc;

use notetree::application::services::vault::{self, IV_LEN, SALT_LEN};
use notetree::application::services::{TreeService, VaultService};
use notetree::domain::{CipherEnvelope, DomainError, NodeId};
use notetree::infrastructure::store::MemoryNodeStore;
use notetree::infrastructure::traits::NodeStore;
use notetree::util::testing;

fn setup() -> (TreeService, VaultService) {
    testing::init_test_setup();
    let store: Arc<dyn NodeStore> = Arc::new(MemoryNodeStore::new());
    (TreeService::new(Arc::clone(&store)), VaultService::new(store))
}

#[test]
fn given_plaintext_when_encrypt_then_decrypt_returns_it_and_wrong_password_fails() {
    // Arrange
    let plaintext = "<p>secret ünïcode ✓</p>";

    // Act
    let envelope = vault::encrypt(plaintext, "correct horse").unwrap();

    // Assert
    assert_eq!(envelope.salt.len(), SALT_LEN);
    assert_eq!(envelope.iv.len(), IV_LEN);
    assert_ne!(envelope.ciphertext, plaintext.as_bytes());
    assert_eq!(vault::decrypt(&envelope, "correct horse").unwrap(), plaintext);
    assert_eq!(
        vault::decrypt(&envelope, "wrong").unwrap_err(),
        DomainError::AuthenticationFailure
    );
}

#[test]
fn given_same_input_when_encrypted_twice_then_salt_and_iv_differ() {
    let a = vault::encrypt("x", "pw").unwrap();
    let b = vault::encrypt("x", "pw").unwrap();
    assert_ne!(a.salt, b.salt);
    assert_ne!(a.iv, b.iv);
}

#[test]
fn given_tampered_ciphertext_when_decrypt_then_authentication_failure() {
    let mut envelope = vault::encrypt("payload", "pw").unwrap();
    envelope.ciphertext[0] ^= 0x01;
    assert_eq!(
        vault::decrypt(&envelope, "pw").unwrap_err(),
        DomainError::AuthenticationFailure
    );
}

#[test]
fn given_short_iv_when_decrypt_then_authentication_failure_without_panic() {
    let envelope = CipherEnvelope {
        ciphertext: vec![1, 2, 3],
        iv: vec![0; 4],
        salt: vec![0; SALT_LEN],
    };
    assert_eq!(
        vault::decrypt(&envelope, "pw").unwrap_err(),
        DomainError::AuthenticationFailure
    );
}

#[test]
fn given_file_when_encrypt_node_then_content_is_envelope_and_decrypt_restores() {
    // Arrange
    let (tree, vault) = setup();
    let id = tree.import_file(NodeId::ROOT, "diary", "dear diary").unwrap();

    // Act
    vault.encrypt_node(id, "pw").unwrap();

    // Assert: stored content is an envelope, writes are refused
    let stored = tree.get(id).unwrap();
    assert!(stored.is_encrypted());
    let envelope = CipherEnvelope::from_json(stored.content().unwrap()).unwrap();
    assert_eq!(vault.decrypt(&envelope, "pw").unwrap(), "dear diary");
    assert_eq!(
        tree.write_content(id, "x").unwrap_err().domain(),
        Some(&DomainError::ContentLocked(id))
    );
    assert_eq!(
        vault.encrypt_node(id, "pw").unwrap_err().domain(),
        Some(&DomainError::AlreadyEncrypted(id))
    );

    // Act: wrong password leaves envelope untouched
    let err = vault.decrypt_node(id, "nope").unwrap_err();
    assert_eq!(err.domain(), Some(&DomainError::AuthenticationFailure));
    assert_eq!(tree.get(id).unwrap().content(), stored.content());

    // Act: right password restores plaintext
    assert_eq!(vault.decrypt_node(id, "pw").unwrap(), "dear diary");
    let restored = tree.get(id).unwrap();
    assert!(!restored.is_encrypted());
    assert_eq!(restored.content(), Some("dear diary"));
}

#[test]
fn given_folder_or_plain_file_when_misused_then_domain_errors() {
    let (tree, vault) = setup();
    let dir = tree.create(NodeId::ROOT, "dir", true).unwrap();
    let plain = tree.create(NodeId::ROOT, "plain", false).unwrap();

    assert_eq!(
        vault.encrypt_node(dir, "pw").unwrap_err().domain(),
        Some(&DomainError::NotAFile(dir))
    );
    assert_eq!(
        vault.decrypt_node(plain, "pw").unwrap_err().domain(),
        Some(&DomainError::NotEncrypted(plain))
    );
}

#[test]
fn given_encrypted_file_when_exporting_then_content_locked() {
    let (tree, vault) = setup();
    let id = tree.import_file(NodeId::ROOT, "f", "body").unwrap();
    vault.encrypt_node(id, "pw").unwrap();

    assert_eq!(
        tree.export_file(id).unwrap_err().domain(),
        Some(&DomainError::ContentLocked(id))
    );
    assert_eq!(vault.peek_node(id, "pw").unwrap(), "body");
    assert!(tree.get(id).unwrap().is_encrypted());
}
