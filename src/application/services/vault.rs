//! Vault: password-based encryption of node content
//!
//! PBKDF2-HMAC-SHA256 (100 000 iterations) derives a 256-bit key from the
//! password and a fresh random salt; AES-256-GCM encrypts under a fresh
//! 96-bit IV. Salt and IV travel in the [`CipherEnvelope`] next to the
//! ciphertext. Passwords are never stored.

use std::num::NonZeroU32;
use std::sync::Arc;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use ring::pbkdf2;
use tracing::{debug, instrument};
use zeroize::Zeroizing;

use crate::application::{ApplicationError, ApplicationResult, StoreResultExt};
use crate::domain::{CipherEnvelope, DomainError, NodeId, NodeKind};
use crate::infrastructure::traits::NodeStore;

pub const PBKDF2_ITERATIONS: u32 = 100_000;
pub const SALT_LEN: usize = 16;
pub const IV_LEN: usize = 12;
pub const KEY_LEN: usize = 32;

const ITERATIONS: NonZeroU32 = match NonZeroU32::new(PBKDF2_ITERATIONS) {
    Some(n) => n,
    None => panic!("PBKDF2 iteration count must be non-zero"),
};

/// Derive the AES key for `password` and `salt`.
pub fn derive_key(password: &str, salt: &[u8]) -> Zeroizing<[u8; KEY_LEN]> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        ITERATIONS,
        salt,
        password.as_bytes(),
        &mut key[..],
    );
    key
}

/// Encrypt `plaintext` under a key derived from `password`.
#[instrument(level = "debug", skip_all, fields(len = plaintext.len()))]
pub fn encrypt(plaintext: &str, password: &str) -> ApplicationResult<CipherEnvelope> {
    let mut salt = vec![0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let mut iv = vec![0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);

    let key = derive_key(password, &salt);
    let cipher = Aes256Gcm::new_from_slice(&key[..]).map_err(|e| {
        ApplicationError::OperationFailed {
            context: "create AES-256-GCM cipher".to_string(),
            source: Box::new(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())),
        }
    })?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext.as_bytes())
        .map_err(|e| ApplicationError::OperationFailed {
            context: "encrypt content".to_string(),
            source: Box::new(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())),
        })?;

    Ok(CipherEnvelope {
        ciphertext,
        iv,
        salt,
    })
}

/// Decrypt `envelope` with `password`.
///
/// Fails closed with `AuthenticationFailure` on a wrong password, a tampered
/// envelope or a malformed IV; no partial plaintext is ever returned.
#[instrument(level = "debug", skip_all)]
pub fn decrypt(envelope: &CipherEnvelope, password: &str) -> Result<String, DomainError> {
    if envelope.iv.len() != IV_LEN {
        return Err(DomainError::AuthenticationFailure);
    }
    let key = derive_key(password, &envelope.salt);
    let cipher =
        Aes256Gcm::new_from_slice(&key[..]).map_err(|_| DomainError::AuthenticationFailure)?;
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&envelope.iv), envelope.ciphertext.as_slice())
        .map_err(|_| DomainError::AuthenticationFailure)?;
    String::from_utf8(plaintext).map_err(|_| DomainError::AuthenticationFailure)
}

/// Encrypts and decrypts file nodes in place.
pub struct VaultService {
    store: Arc<dyn NodeStore>,
}

impl VaultService {
    pub fn new(store: Arc<dyn NodeStore>) -> Self {
        Self { store }
    }

    pub fn encrypt(&self, plaintext: &str, password: &str) -> ApplicationResult<CipherEnvelope> {
        encrypt(plaintext, password)
    }

    pub fn decrypt(&self, envelope: &CipherEnvelope, password: &str) -> ApplicationResult<String> {
        Ok(decrypt(envelope, password)?)
    }

    /// Replace the content of file `id` with its cipher envelope.
    #[instrument(level = "debug", skip(self, password))]
    pub fn encrypt_node(&self, id: NodeId, password: &str) -> ApplicationResult<()> {
        let mut node = self.store.read(id).with_store_context("read node")?;
        let plaintext = match &node.kind {
            NodeKind::Folder => return Err(DomainError::NotAFile(id).into()),
            NodeKind::File {
                encrypted: true, ..
            } => return Err(DomainError::AlreadyEncrypted(id).into()),
            NodeKind::File { content, .. } => content,
        };
        let envelope = encrypt(plaintext, password)?;
        node.kind = NodeKind::File {
            content: envelope.to_json()?,
            encrypted: true,
        };
        self.store
            .write_all(&mut node)
            .with_store_context("write encrypted node")?;
        debug!("encrypt_node: {} encrypted", id);
        Ok(())
    }

    /// Decrypt file `id` and store the plaintext, returning it.
    ///
    /// The stored envelope is left untouched when decryption fails, so the
    /// caller may retry with another password.
    #[instrument(level = "debug", skip(self, password))]
    pub fn decrypt_node(&self, id: NodeId, password: &str) -> ApplicationResult<String> {
        let mut node = self.store.read(id).with_store_context("read node")?;
        let envelope = match &node.kind {
            NodeKind::Folder => return Err(DomainError::NotAFile(id).into()),
            NodeKind::File {
                encrypted: false, ..
            } => return Err(DomainError::NotEncrypted(id).into()),
            NodeKind::File { content, .. } => CipherEnvelope::from_json(content)?,
        };
        let plaintext = decrypt(&envelope, password)?;
        node.kind = NodeKind::File {
            content: plaintext.clone(),
            encrypted: false,
        };
        self.store
            .write_all(&mut node)
            .with_store_context("write decrypted node")?;
        debug!("decrypt_node: {} decrypted", id);
        Ok(plaintext)
    }

    /// Decrypt file `id` for viewing without changing what is stored.
    pub fn peek_node(&self, id: NodeId, password: &str) -> ApplicationResult<String> {
        let node = self.store.read(id).with_store_context("read node")?;
        match &node.kind {
            NodeKind::Folder => Err(DomainError::NotAFile(id).into()),
            NodeKind::File {
                encrypted: false, ..
            } => Err(DomainError::NotEncrypted(id).into()),
            NodeKind::File { content, .. } => {
                Ok(decrypt(&CipherEnvelope::from_json(content)?, password)?)
            }
        }
    }
}
