//! The encrypted message envelope.
//!
//! An envelope is the unit of exchange between sender, storage and recipient:
//! three opaque base64 fields and nothing else. It carries no sender identity
//! and no key fingerprint; who sent it is recorded by the message store, and
//! the envelope itself proves nothing about its author.
//!
//! # Invariants
//!
//! - Fields are never mutated after creation
//! - Storage must return every field byte-for-byte; any normalization
//!   (including whitespace) makes decryption fail
//!
//! # Wire names
//!
//! Serialized field names are `cipherText`, `wrappedKey` and `iv`. The legacy
//! names `cipher_text` and `aes_key` are accepted when deserializing.

use serde::{Deserialize, Serialize};

use crate::error::CryptoError;

/// Hybrid-encrypted message: body ciphertext, wrapped one-time key, IV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedMessage {
    /// AES-GCM ciphertext and tag, base64
    #[serde(rename = "cipherText", alias = "cipher_text")]
    cipher_text: String,

    /// One-time key wrapped to the recipient's public key, base64
    #[serde(rename = "wrappedKey", alias = "aes_key", alias = "wrapped_key")]
    wrapped_key: String,

    /// 12-byte IV, base64
    iv: String,
}

impl EncryptedMessage {
    /// Reassemble an envelope from stored fields.
    ///
    /// Fields are taken verbatim. Use [`validate`](Self::validate) to reject
    /// obviously incomplete input before storing it.
    pub fn from_parts(
        cipher_text: impl Into<String>,
        wrapped_key: impl Into<String>,
        iv: impl Into<String>,
    ) -> Self {
        Self { cipher_text: cipher_text.into(), wrapped_key: wrapped_key.into(), iv: iv.into() }
    }

    /// Base64 body ciphertext.
    pub fn cipher_text(&self) -> &str {
        &self.cipher_text
    }

    /// Base64 wrapped symmetric key.
    pub fn wrapped_key(&self) -> &str {
        &self.wrapped_key
    }

    /// Base64 initialization vector.
    pub fn iv(&self) -> &str {
        &self.iv
    }

    /// Reject envelopes with missing fields.
    ///
    /// This is a shape check only; it says nothing about whether the envelope
    /// decrypts.
    pub fn validate(&self) -> Result<(), CryptoError> {
        let fields = [
            ("cipherText", &self.cipher_text),
            ("wrappedKey", &self.wrapped_key),
            ("iv", &self.iv),
        ];
        for (name, value) in fields {
            if value.is_empty() {
                return Err(CryptoError::MalformedEnvelope { reason: format!("missing {name}") });
            }
        }
        Ok(())
    }

    /// Encode as CBOR for byte-oriented transports.
    pub fn to_cbor(&self) -> Result<Vec<u8>, CryptoError> {
        let mut buffer = Vec::new();
        ciborium::ser::into_writer(self, &mut buffer)
            .map_err(|e| CryptoError::MalformedEnvelope { reason: e.to_string() })?;
        Ok(buffer)
    }

    /// Decode from CBOR and check the shape.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self, CryptoError> {
        let envelope: Self = ciborium::de::from_reader(bytes)
            .map_err(|e| CryptoError::MalformedEnvelope { reason: e.to_string() })?;
        envelope.validate()?;
        Ok(envelope)
    }
}
