//! Conversation orchestration over a key directory and message store.
//!
//! The [`Messenger`] is the only place plaintext meets the collaborators: it
//! encrypts before anything reaches the store and decrypts after envelopes
//! come back. Private keys are supplied per call through a [`KeyCustody`].
//!
//! # Send path
//!
//! ```text
//! directory.public_key(recipient) ── None ──▶ RecipientNotEncryptionReady
//!        │ Some(pem)
//!        ▼
//! cipher.encrypt(plaintext, pem) ──▶ store.put_message(envelope)
//! ```

use cloak_crypto::{CryptoBackend, HybridCipher, KeyHandle};

use crate::{
    custody::KeyCustody,
    directory::KeyDirectory,
    error::MessagingError,
    identity::{MessageId, UserId},
    store::{ConversationSummary, MessageStore, StoredMessage},
    vault::KeyVault,
};

/// Outcome of [`Messenger::enroll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enrollment {
    /// A new key pair was generated, stored and published.
    Generated,
    /// The vault already held a private key; nothing changed.
    Existing,
}

/// Body of a message as seen by one participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    /// Incoming message, decrypted.
    Plaintext(String),
    /// Incoming message that could not be decrypted with the current key.
    Undecryptable,
    /// Message we sent. It is sealed to the recipient's key and cannot be
    /// read back by the sender.
    Outgoing,
}

/// One message of a conversation listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationEntry {
    /// Store-assigned identifier
    pub id: MessageId,
    /// Author
    pub sender: UserId,
    /// Addressee
    pub recipient: UserId,
    /// Unix timestamp (seconds) the store accepted the message
    pub created_at_secs: u64,
    /// Read state before this listing
    pub read: bool,
    /// Decrypted content or placeholder
    pub body: MessageBody,
}

/// End-to-end encrypted messaging over untrusted collaborators.
#[derive(Debug, Clone)]
pub struct Messenger<B: CryptoBackend, D: KeyDirectory, S: MessageStore> {
    cipher: HybridCipher<B>,
    directory: D,
    store: S,
}

impl<B: CryptoBackend, D: KeyDirectory, S: MessageStore> Messenger<B, D, S> {
    /// Create a messenger.
    pub fn new(cipher: HybridCipher<B>, directory: D, store: S) -> Self {
        Self { cipher, directory, store }
    }

    /// Cipher used for all envelopes.
    pub fn cipher(&self) -> &HybridCipher<B> {
        &self.cipher
    }

    /// Public key directory.
    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Message store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Make sure the identity in custody can receive messages.
    ///
    /// If the vault already holds a private key, its public half is
    /// republished when the directory lacks it and no new key is made.
    /// Otherwise a new pair is generated, the private half is written to the
    /// vault, and only then is the public half published.
    pub fn enroll<V: KeyVault>(
        &self,
        custody: &KeyCustody<V>,
    ) -> Result<Enrollment, MessagingError> {
        if custody.has_private_key()? {
            let public_key = self.cipher.keys().public_key_pem(&custody.private_key()?)?;
            if self.directory.public_key(custody.user())?.as_deref() != Some(public_key.as_str()) {
                self.directory.publish(custody.user(), &public_key)?;
                tracing::info!(user = %custody.user(), "republished public key from vault");
            } else {
                tracing::debug!(user = %custody.user(), "private key already held");
            }
            return Ok(Enrollment::Existing);
        }

        self.regenerate_keys(custody)?;
        Ok(Enrollment::Generated)
    }

    /// Replace the identity's key pair unconditionally.
    ///
    /// Every message previously addressed to this identity becomes
    /// permanently undecryptable.
    pub fn regenerate_keys<V: KeyVault>(
        &self,
        custody: &KeyCustody<V>,
    ) -> Result<(), MessagingError> {
        let pair = self.cipher.generate_key_pair()?;

        custody.store(&pair)?;
        self.directory.publish(custody.user(), pair.public_key())?;

        tracing::info!(user = %custody.user(), "generated and published new key pair");
        Ok(())
    }

    /// Publish a public key for `user`, replacing any earlier one.
    ///
    /// The PEM must import as an encrypt key; private keys and malformed text
    /// are rejected before reaching the directory.
    pub fn publish_public_key(
        &self,
        user: &UserId,
        public_key_pem: &str,
    ) -> Result<(), MessagingError> {
        self.cipher.keys().import_public_key(public_key_pem)?;
        self.directory.publish(user, public_key_pem)?;

        tracing::info!(%user, "published public key");
        Ok(())
    }

    /// Encrypt `plaintext` to `recipient`'s published key and store it.
    ///
    /// Fails with `RecipientNotEncryptionReady` if the recipient has no
    /// published key; nothing is stored in that case.
    pub fn send(
        &self,
        sender: &UserId,
        recipient: &UserId,
        plaintext: &str,
    ) -> Result<MessageId, MessagingError> {
        let Some(public_key) = self.directory.public_key(recipient)? else {
            tracing::warn!(%sender, %recipient, "recipient has not published a key");
            return Err(MessagingError::RecipientNotEncryptionReady { recipient: recipient.clone() });
        };

        let envelope = self.cipher.encrypt(plaintext, &public_key)?;
        let id = self.store.put_message(sender, recipient, &envelope)?;

        tracing::debug!(%sender, %recipient, message_id = %id, "stored encrypted message");
        Ok(id)
    }

    /// List the conversation between the custody's identity and `other`.
    ///
    /// Entries are in store order. Incoming messages are decrypted; any that
    /// fail become [`MessageBody::Undecryptable`] without aborting the
    /// listing. The incoming messages shown are marked read afterwards;
    /// anything stored after the listing was taken stays unread.
    pub fn conversation<V: KeyVault>(
        &self,
        custody: &KeyCustody<V>,
        other: &UserId,
    ) -> Result<Vec<ConversationEntry>, MessagingError> {
        let me = custody.user();
        let stored = self.store.messages(me, other)?;

        let incoming: Vec<MessageId> =
            stored.iter().filter(|m| &m.recipient == me).map(|m| m.id).collect();
        let key = if incoming.is_empty() {
            None
        } else {
            let pem = custody.private_key()?;
            Some(self.cipher.keys().import_private_key(&pem)?)
        };

        let mut entries = Vec::with_capacity(stored.len());
        for message in stored {
            let body = match &key {
                Some(key) if &message.recipient == me => self.open(&message, key)?,
                _ => MessageBody::Outgoing,
            };

            entries.push(ConversationEntry {
                id: message.id,
                sender: message.sender,
                recipient: message.recipient,
                created_at_secs: message.created_at_secs,
                read: message.read,
                body,
            });
        }

        if !incoming.is_empty() {
            let marked = self.store.mark_read(me, &incoming)?;
            tracing::debug!(user = %me, %other, marked, "marked conversation read");
        }

        Ok(entries)
    }

    /// Conversation list for `user`, most recent first.
    pub fn conversations(&self, user: &UserId) -> Result<Vec<ConversationSummary>, MessagingError> {
        Ok(self.store.conversations(user)?)
    }

    fn open(
        &self,
        message: &StoredMessage,
        key: &KeyHandle<B>,
    ) -> Result<MessageBody, MessagingError> {
        match self.cipher.decrypt_with(&message.envelope, key) {
            Ok(plaintext) => Ok(MessageBody::Plaintext(plaintext)),
            Err(e) if e.is_per_message() => {
                tracing::warn!(
                    message_id = %message.id,
                    sender = %message.sender,
                    "message could not be decrypted: {e}"
                );
                Ok(MessageBody::Undecryptable)
            },
            Err(e) => Err(e.into()),
        }
    }
}
