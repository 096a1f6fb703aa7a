//! Public key directory.
//!
//! Maps each identity to its single active public key. The directory is an
//! untrusted collaborator: it sees only public keys and performs no
//! cryptography.

#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use crate::{error::StoreError, identity::UserId};

/// Publishes and looks up public keys by identity.
///
/// Must be Clone, Send + Sync, and synchronous. Implementations typically
/// share internal state via Arc, so clones access the same directory.
pub trait KeyDirectory: Clone + Send + Sync + 'static {
    /// Set the active public key for `user`, replacing any earlier one.
    fn publish(&self, user: &UserId, public_key_pem: &str) -> Result<(), StoreError>;

    /// Active public key for `user`. `None` if never published.
    fn public_key(&self, user: &UserId) -> Result<Option<String>, StoreError>;
}

/// In-memory directory for tests and single-process deployments.
///
/// Thread-safe via Arc<Mutex<_>>. Clone shares the same underlying storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyDirectory {
    keys: Arc<Mutex<HashMap<UserId, String>>>,
}

impl MemoryKeyDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of identities with a published key.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    pub fn len(&self) -> usize {
        self.keys.lock().expect("Mutex poisoned").len()
    }

    /// Whether no keys are published.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyDirectory for MemoryKeyDirectory {
    #[allow(clippy::expect_used)]
    fn publish(&self, user: &UserId, public_key_pem: &str) -> Result<(), StoreError> {
        self.keys
            .lock()
            .expect("Mutex poisoned")
            .insert(user.clone(), public_key_pem.to_string());
        Ok(())
    }

    #[allow(clippy::expect_used)]
    fn public_key(&self, user: &UserId) -> Result<Option<String>, StoreError> {
        Ok(self.keys.lock().expect("Mutex poisoned").get(user).cloned())
    }
}
