//! Error types for key handling and hybrid encryption.

use thiserror::Error;

use crate::keys::KeyUsage;

/// Errors produced by the codec, key provider and hybrid cipher.
///
/// Every variant is terminal for the operation that raised it. Retrying a
/// cryptographic failure cannot succeed: the cause is the data, not a
/// transient condition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// PEM framing or base64 body could not be decoded.
    #[error("malformed key encoding: {reason}")]
    MalformedKeyEncoding {
        /// What was wrong with the text
        reason: String,
    },

    /// Decoded bytes are not a valid key of the expected type.
    #[error("invalid key material: {reason}")]
    InvalidKeyMaterial {
        /// What was wrong with the key
        reason: String,
    },

    /// Handle was imported for the opposite direction.
    #[error("unsupported key usage: operation requires {required:?}, handle allows {actual:?}")]
    UnsupportedKeyUsage {
        /// Usage the operation needs
        required: KeyUsage,
        /// Usage the handle was imported with
        actual: KeyUsage,
    },

    /// Wrong key, tampered envelope, or authentication tag mismatch.
    ///
    /// Carries no detail: callers must not learn whether key
    /// unwrap or body decryption failed.
    #[error("decryption failed")]
    DecryptionFailed,

    /// Cipher succeeded but the recovered bytes are not UTF-8.
    #[error("decrypted message is not valid UTF-8")]
    MalformedPlaintext,

    /// Plaintext exceeds the configured limit.
    #[error("message too large: {len} bytes exceeds limit of {max}")]
    MessageTooLarge {
        /// Plaintext length in bytes
        len: usize,
        /// Configured maximum
        max: usize,
    },

    /// Envelope is missing a field or failed to (de)serialize.
    #[error("malformed envelope: {reason}")]
    MalformedEnvelope {
        /// What was wrong with the envelope
        reason: String,
    },

    /// Key pair generation failed inside the backend.
    #[error("key generation failed: {reason}")]
    KeyGeneration {
        /// Backend error message
        reason: String,
    },

    /// Encryption failed inside the backend.
    #[error("encryption failed: {reason}")]
    Encryption {
        /// Backend error message
        reason: String,
    },

    /// Configuration rejected before use.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Which setting is invalid
        reason: String,
    },
}

impl CryptoError {
    /// True for failures that a conversation listing renders as an
    /// undecryptable placeholder instead of aborting.
    pub fn is_per_message(&self) -> bool {
        matches!(self, Self::DecryptionFailed | Self::MalformedPlaintext)
    }
}
