//! Messaging error types.
//!
//! - `MessagingError`: what callers of [`crate::Messenger`] see
//! - `StoreError`: failures of the message store or key directory
//! - `VaultError`: failures of client-side private key storage

use cloak_crypto::CryptoError;
use thiserror::Error;

use crate::identity::UserId;

/// Errors returned by messaging operations.
///
/// Every variant is terminal for the operation that produced it; nothing is
/// retried internally.
#[derive(Error, Debug)]
pub enum MessagingError {
    /// The recipient has never published a public key.
    ///
    /// Nothing was stored. There is no plaintext fallback.
    #[error("recipient {recipient} has not set up encryption")]
    RecipientNotEncryptionReady {
        /// Recipient without a published key
        recipient: UserId,
    },

    /// The local vault holds no private key for this identity.
    #[error("no private key held for {user}")]
    NotEnrolled {
        /// Identity without a stored private key
        user: UserId,
    },

    /// Key import, encryption or decryption failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Message store or key directory failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Private key vault failed.
    #[error(transparent)]
    Vault(#[from] VaultError),
}

/// Errors from message store and key directory collaborators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Envelope is missing required fields
    #[error("missing required fields: {0}")]
    MissingFields(String),

    /// Backend unavailable or failed
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Errors from private key vaults.
#[derive(Error, Debug)]
pub enum VaultError {
    /// Filesystem access failed
    #[error("vault I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored content is not a usable key
    #[error("corrupt vault entry for {user}: {reason}")]
    Corrupt {
        /// Identity whose entry is unreadable
        user: UserId,
        /// What was wrong with it
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipient_not_ready_names_recipient() {
        let err = MessagingError::RecipientNotEncryptionReady { recipient: UserId::new("bob") };
        assert_eq!(err.to_string(), "recipient bob has not set up encryption");
    }

    #[test]
    fn crypto_errors_convert() {
        let err: MessagingError = CryptoError::DecryptionFailed.into();
        assert!(matches!(err, MessagingError::Crypto(CryptoError::DecryptionFailed)));
    }
}
