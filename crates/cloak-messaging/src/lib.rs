//! Cloak Messaging
//!
//! End-to-end encrypted one-to-one conversations on top of `cloak-crypto`.
//! The server side is modelled as two untrusted collaborators: a
//! [`KeyDirectory`] mapping identities to public keys and a [`MessageStore`]
//! holding opaque envelopes. Neither ever sees plaintext or a private key.
//!
//! # Key Custody
//!
//! Each client owns a [`KeyCustody`]: its identity plus the [`KeyVault`] that
//! holds its private key. Custody is passed explicitly into every operation
//! that decrypts.
//!
//! ```text
//! client                         directory / store
//! ──────                         ─────────────────
//! generate pair
//!   private → vault
//!   public  ───────────────────▶ publish(user, public)
//!
//! send(plaintext)
//!   public_key(recipient) ◀──── lookup
//!   encrypt ───────────────────▶ put_message(envelope)
//!
//! conversation(custody, other)
//!   messages ◀────────────────── envelopes, in order
//!   decrypt with vault key
//! ```
//!
//! # Failure handling
//!
//! - Missing recipient key: the send fails, nothing is stored
//! - Undecryptable message: shown as a placeholder, the rest of the
//!   conversation still decrypts
//! - Lost private key: every earlier message to that identity is gone for
//!   good

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod clock;
pub mod custody;
pub mod directory;
pub mod error;
pub mod identity;
pub mod messenger;
pub mod store;
pub mod vault;

pub use clock::{Clock, ManualClock, SystemClock};
pub use custody::KeyCustody;
pub use directory::{KeyDirectory, MemoryKeyDirectory};
pub use error::{MessagingError, StoreError, VaultError};
pub use identity::{MessageId, UserId};
pub use messenger::{ConversationEntry, Enrollment, MessageBody, Messenger};
pub use store::{
    ChaoticMessageStore, ConversationSummary, MemoryMessageStore, MessageStore, StoredMessage,
};
pub use vault::{FileKeyVault, KeyVault, MemoryKeyVault};
