//! Ownership of one identity's private key.
//!
//! A [`KeyCustody`] pairs an identity with the vault that holds its private
//! key. It is created by the client and passed explicitly to operations that
//! need to decrypt; there is no process-wide "current key".

use cloak_crypto::KeyPair;
use zeroize::Zeroizing;

use crate::{
    error::MessagingError,
    identity::UserId,
    vault::KeyVault,
};

/// An identity and the vault holding its private key.
pub struct KeyCustody<V: KeyVault> {
    user: UserId,
    vault: V,
}

impl<V: KeyVault> KeyCustody<V> {
    /// Take custody of `user`'s keys in `vault`.
    pub fn new(user: impl Into<UserId>, vault: V) -> Self {
        Self { user: user.into(), vault }
    }

    /// Identity in custody.
    pub fn user(&self) -> &UserId {
        &self.user
    }

    /// Backing vault.
    pub fn vault(&self) -> &V {
        &self.vault
    }

    /// Whether the vault currently holds a private key for this identity.
    pub fn has_private_key(&self) -> Result<bool, MessagingError> {
        Ok(self.vault.load_private_key(&self.user)?.is_some())
    }

    /// Private key PEM, or `NotEnrolled` if the vault is empty.
    pub fn private_key(&self) -> Result<Zeroizing<String>, MessagingError> {
        self.vault
            .load_private_key(&self.user)?
            .ok_or_else(|| MessagingError::NotEnrolled { user: self.user.clone() })
    }

    /// Store the private half of a freshly generated pair.
    ///
    /// Only the private half is kept; publishing the public half is the
    /// caller's job and must happen after this succeeds.
    pub fn store(&self, pair: &KeyPair) -> Result<(), MessagingError> {
        self.vault.store_private_key(&self.user, pair.private_key())?;
        Ok(())
    }

    /// Forget the private key. Messages addressed to it become unreadable.
    pub fn clear(&self) -> Result<(), MessagingError> {
        self.vault.clear_private_key(&self.user)?;
        Ok(())
    }
}

impl<V: KeyVault> std::fmt::Debug for KeyCustody<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyCustody").field("user", &self.user).finish_non_exhaustive()
    }
}
