//! Chaotic message store wrapper for fault injection testing
//!
//! Delegates to an underlying store but fails a configurable fraction of
//! operations, so callers' error paths can be exercised deterministically.

#![allow(clippy::disallowed_types, reason = "Locking simple RNG state")]

use std::sync::{Arc, Mutex};

use cloak_crypto::EncryptedMessage;

use super::{ConversationSummary, MessageStore, StoredMessage};
use crate::{
    error::StoreError,
    identity::{MessageId, UserId},
};

/// Store wrapper that randomly injects `StoreError::Unavailable`
///
/// A failed operation has no effect on the inner store.
#[derive(Clone)]
pub struct ChaoticMessageStore<S: MessageStore> {
    inner: S,
    /// Failure rate (0.0 = never fail, 1.0 = always fail)
    failure_rate: f64,
    rng: Arc<Mutex<ChaoticRng>>,
}

/// Linear congruential generator, reproducible from its seed
struct ChaoticRng {
    state: u64,
}

impl ChaoticRng {
    /// Next value in [0.0, 1.0)
    fn next(&mut self) -> f64 {
        // Numerical Recipes constants
        const A: u64 = 1_664_525;
        const C: u64 = 1_013_904_223;
        const M: u64 = 1u64 << 32;

        self.state = (A.wrapping_mul(self.state).wrapping_add(C)) % M;
        (self.state as f64) / (M as f64)
    }
}

impl<S: MessageStore> ChaoticMessageStore<S> {
    /// Wrap `inner` with a fixed default seed.
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn new(inner: S, failure_rate: f64) -> Self {
        Self::with_seed(inner, failure_rate, 0x1234_5678_9ABC_DEF0)
    }

    /// Wrap `inner` with an explicit seed for reproducible chaos.
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn with_seed(inner: S, failure_rate: f64, seed: u64) -> Self {
        assert!(
            (0.0..=1.0).contains(&failure_rate),
            "failure_rate must be between 0.0 and 1.0, got {failure_rate}"
        );

        Self { inner, failure_rate, rng: Arc::new(Mutex::new(ChaoticRng { state: seed })) }
    }

    /// Underlying store (for checking invariants after chaos).
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn check(&self) -> Result<(), StoreError> {
        #[allow(clippy::expect_used)]
        let roll = self.rng.lock().expect("ChaoticRng mutex poisoned").next();
        if roll < self.failure_rate {
            return Err(StoreError::Unavailable("chaotic failure injection".to_string()));
        }
        Ok(())
    }
}

impl<S: MessageStore> MessageStore for ChaoticMessageStore<S> {
    fn put_message(
        &self,
        sender: &UserId,
        recipient: &UserId,
        envelope: &EncryptedMessage,
    ) -> Result<MessageId, StoreError> {
        self.check()?;
        self.inner.put_message(sender, recipient, envelope)
    }

    fn messages(&self, user: &UserId, other: &UserId) -> Result<Vec<StoredMessage>, StoreError> {
        self.check()?;
        self.inner.messages(user, other)
    }

    fn mark_read(&self, reader: &UserId, ids: &[MessageId]) -> Result<usize, StoreError> {
        self.check()?;
        self.inner.mark_read(reader, ids)
    }

    fn conversations(&self, user: &UserId) -> Result<Vec<ConversationSummary>, StoreError> {
        self.check()?;
        self.inner.conversations(user)
    }
}
