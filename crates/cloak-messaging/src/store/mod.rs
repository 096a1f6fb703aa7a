//! Message store abstraction
//!
//! The store persists envelopes keyed by sender and recipient and returns them
//! unchanged. It never sees plaintext and performs no cryptography. The trait
//! is synchronous; network-backed implementations block on their transport.

mod chaotic;
mod memory;

use cloak_crypto::EncryptedMessage;
pub use chaotic::ChaoticMessageStore;
pub use memory::MemoryMessageStore;
use serde::{Deserialize, Serialize};

use crate::{
    error::StoreError,
    identity::{MessageId, UserId},
};

/// A message as persisted by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Store-assigned identifier
    pub id: MessageId,
    /// Author as recorded by the store
    pub sender: UserId,
    /// Addressee
    pub recipient: UserId,
    /// Envelope exactly as submitted
    pub envelope: EncryptedMessage,
    /// Unix timestamp (seconds) when the store accepted the message
    pub created_at_secs: u64,
    /// Whether the recipient has listed this message
    pub read: bool,
}

/// One entry in a user's conversation list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    /// The other participant
    pub other: UserId,
    /// Timestamp of the newest message in either direction
    pub last_message_at_secs: u64,
    /// Messages from `other` not yet marked read
    pub unread_count: usize,
}

/// Storage for encrypted messages
///
/// Must be Clone (shared between messengers), Send + Sync (thread-safe), and
/// synchronous. Implementations typically share internal state via Arc, so
/// clones access the same underlying storage.
///
/// # Invariants
///
/// - Envelopes are returned byte-for-byte as submitted
/// - `messages` is ordered by `(created_at_secs, id)` ascending
/// - `conversations` is ordered by `last_message_at_secs` descending
pub trait MessageStore: Clone + Send + Sync + 'static {
    /// Persist an envelope from `sender` to `recipient`.
    ///
    /// Rejects envelopes with empty fields with `StoreError::MissingFields`.
    fn put_message(
        &self,
        sender: &UserId,
        recipient: &UserId,
        envelope: &EncryptedMessage,
    ) -> Result<MessageId, StoreError>;

    /// All messages between `user` and `other`, in both directions.
    fn messages(&self, user: &UserId, other: &UserId) -> Result<Vec<StoredMessage>, StoreError>;

    /// Mark the listed messages addressed to `reader` as read.
    ///
    /// Ids of messages addressed to someone else, or unknown ids, are ignored.
    /// Returns how many messages changed state.
    fn mark_read(&self, reader: &UserId, ids: &[MessageId]) -> Result<usize, StoreError>;

    /// Every conversation `user` takes part in, most recent first.
    fn conversations(&self, user: &UserId) -> Result<Vec<ConversationSummary>, StoreError>;
}
