//! Cipher envelope: ciphertext + IV + salt, persisted as a node's content

use serde::{Deserialize, Serialize};
use serde_with::base64::Base64;
use serde_with::serde_as;

use crate::domain::DomainError;

/// Output of an encryption, stored in place of plaintext.
///
/// Serialized as a JSON object with three standard-base64 fields:
/// `{"c": ciphertext, "iv": iv, "s": salt}`. IV and salt are not secret.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CipherEnvelope {
    /// Ciphertext including the GCM tag
    #[serde(rename = "c")]
    #[serde_as(as = "Base64")]
    pub ciphertext: Vec<u8>,

    #[serde_as(as = "Base64")]
    pub iv: Vec<u8>,

    #[serde(rename = "s")]
    #[serde_as(as = "Base64")]
    pub salt: Vec<u8>,
}

impl CipherEnvelope {
    /// Text form persisted in `content`.
    pub fn to_json(&self) -> Result<String, DomainError> {
        serde_json::to_string(self).map_err(|e| DomainError::InvalidEnvelope(e.to_string()))
    }

    /// Parse the text form produced by [`CipherEnvelope::to_json`].
    pub fn from_json(text: &str) -> Result<Self, DomainError> {
        serde_json::from_str(text).map_err(|e| DomainError::InvalidEnvelope(e.to_string()))
    }
}
