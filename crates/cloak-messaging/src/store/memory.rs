#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use cloak_crypto::EncryptedMessage;

use super::{ConversationSummary, MessageStore, StoredMessage};
use crate::{
    clock::{Clock, SystemClock},
    error::StoreError,
    identity::{MessageId, UserId},
};

/// In-memory message store for testing and single-process use
///
/// Messages live in one append-only Vec, so insertion order doubles as the
/// id order. All state is wrapped in Arc<Mutex<>> to allow Clone and
/// concurrent access; `lock().expect()` panics if the mutex is poisoned.
#[derive(Clone)]
pub struct MemoryMessageStore<C: Clock = SystemClock> {
    inner: Arc<Mutex<MemoryStoreInner>>,
    clock: C,
}

struct MemoryStoreInner {
    messages: Vec<StoredMessage>,
    next_id: u64,
}

impl MemoryMessageStore<SystemClock> {
    /// Create an empty store timestamped by the system clock.
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for MemoryMessageStore<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MemoryMessageStore<C> {
    /// Create an empty store with an explicit clock.
    pub fn with_clock(clock: C) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryStoreInner { messages: Vec::new(), next_id: 1 })),
            clock,
        }
    }

    /// Total number of stored messages.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    pub fn message_count(&self) -> usize {
        self.inner.lock().expect("Mutex poisoned").messages.len()
    }
}

impl<C: Clock> std::fmt::Debug for MemoryMessageStore<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryMessageStore").field("messages", &self.message_count()).finish()
    }
}

fn between(message: &StoredMessage, user: &UserId, other: &UserId) -> bool {
    (&message.sender == user && &message.recipient == other)
        || (&message.sender == other && &message.recipient == user)
}

impl<C: Clock> MessageStore for MemoryMessageStore<C> {
    #[allow(clippy::expect_used)]
    fn put_message(
        &self,
        sender: &UserId,
        recipient: &UserId,
        envelope: &EncryptedMessage,
    ) -> Result<MessageId, StoreError> {
        envelope.validate().map_err(|e| StoreError::MissingFields(e.to_string()))?;

        let created_at_secs = self.clock.now_secs();
        let mut inner = self.inner.lock().expect("Mutex poisoned");

        let id = MessageId(inner.next_id);
        inner.next_id += 1;

        inner.messages.push(StoredMessage {
            id,
            sender: sender.clone(),
            recipient: recipient.clone(),
            envelope: envelope.clone(),
            created_at_secs,
            read: false,
        });

        Ok(id)
    }

    #[allow(clippy::expect_used)]
    fn messages(&self, user: &UserId, other: &UserId) -> Result<Vec<StoredMessage>, StoreError> {
        let inner = self.inner.lock().expect("Mutex poisoned");

        let mut found: Vec<StoredMessage> =
            inner.messages.iter().filter(|m| between(m, user, other)).cloned().collect();
        found.sort_by_key(|m| (m.created_at_secs, m.id));

        Ok(found)
    }

    #[allow(clippy::expect_used)]
    fn mark_read(&self, reader: &UserId, ids: &[MessageId]) -> Result<usize, StoreError> {
        let mut inner = self.inner.lock().expect("Mutex poisoned");

        let mut changed = 0;
        for message in inner
            .messages
            .iter_mut()
            .filter(|m| &m.recipient == reader && !m.read && ids.contains(&m.id))
        {
            message.read = true;
            changed += 1;
        }

        Ok(changed)
    }

    #[allow(clippy::expect_used)]
    fn conversations(&self, user: &UserId) -> Result<Vec<ConversationSummary>, StoreError> {
        let inner = self.inner.lock().expect("Mutex poisoned");

        let mut by_other: BTreeMap<&UserId, ConversationSummary> = BTreeMap::new();
        for message in &inner.messages {
            let other = if &message.sender == user {
                &message.recipient
            } else if &message.recipient == user {
                &message.sender
            } else {
                continue;
            };

            let summary = by_other.entry(other).or_insert_with(|| ConversationSummary {
                other: other.clone(),
                last_message_at_secs: 0,
                unread_count: 0,
            });
            summary.last_message_at_secs = summary.last_message_at_secs.max(message.created_at_secs);
            if &message.recipient == user && &message.sender == other && !message.read {
                summary.unread_count += 1;
            }
        }

        let mut summaries: Vec<ConversationSummary> = by_other.into_values().collect();
        // Stable sort keeps ties in identity order
        summaries.sort_by(|a, b| b.last_message_at_secs.cmp(&a.last_message_at_secs));

        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn envelope(tag: &str) -> EncryptedMessage {
        EncryptedMessage::from_parts(tag, "d3JhcHBlZA==", "AAAAAAAAAAAAAAAA")
    }

    fn users() -> (UserId, UserId, UserId) {
        (UserId::new("alice"), UserId::new("bob"), UserId::new("carol"))
    }

    #[test]
    fn stores_envelopes_verbatim() {
        let store = MemoryMessageStore::new();
        let (alice, bob, _) = users();
        let original = envelope("Y2lwaGVy\n");

        store.put_message(&alice, &bob, &original).unwrap();

        let messages = store.messages(&bob, &alice).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].envelope, original);
        assert_eq!(messages[0].sender, alice);
        assert!(!messages[0].read);
    }

    #[test]
    fn rejects_envelope_with_missing_fields() {
        let store = MemoryMessageStore::new();
        let (alice, bob, _) = users();
        let incomplete = EncryptedMessage::from_parts("Y2lwaGVy", "", "AAAAAAAAAAAAAAAA");

        let result = store.put_message(&alice, &bob, &incomplete);
        assert!(matches!(result, Err(StoreError::MissingFields(_))));
        assert_eq!(store.message_count(), 0);
    }

    #[test]
    fn messages_cover_both_directions_in_time_order() {
        let clock = ManualClock::new(1_000);
        let store = MemoryMessageStore::with_clock(clock.clone());
        let (alice, bob, carol) = users();

        store.put_message(&alice, &bob, &envelope("first")).unwrap();
        clock.advance(10);
        store.put_message(&bob, &alice, &envelope("second")).unwrap();
        store.put_message(&carol, &alice, &envelope("elsewhere")).unwrap();
        store.put_message(&alice, &bob, &envelope("third")).unwrap();

        let texts: Vec<String> = store
            .messages(&alice, &bob)
            .unwrap()
            .into_iter()
            .map(|m| m.envelope.cipher_text().to_string())
            .collect();
        assert_eq!(texts, ["first", "second", "third"]);
    }

    #[test]
    fn same_timestamp_orders_by_id() {
        let store = MemoryMessageStore::with_clock(ManualClock::new(5));
        let (alice, bob, _) = users();

        let first = store.put_message(&alice, &bob, &envelope("a")).unwrap();
        let second = store.put_message(&bob, &alice, &envelope("b")).unwrap();
        assert!(first < second);

        let ids: Vec<MessageId> = store.messages(&bob, &alice).unwrap().iter().map(|m| m.id).collect();
        assert_eq!(ids, [first, second]);
    }

    #[test]
    fn mark_read_only_touches_listed_incoming() {
        let store = MemoryMessageStore::new();
        let (alice, bob, carol) = users();

        let first = store.put_message(&bob, &alice, &envelope("1")).unwrap();
        let second = store.put_message(&bob, &alice, &envelope("2")).unwrap();
        let outgoing = store.put_message(&alice, &bob, &envelope("3")).unwrap();
        let from_carol = store.put_message(&carol, &alice, &envelope("4")).unwrap();
        let later = store.put_message(&bob, &alice, &envelope("5")).unwrap();

        // Outgoing ids are not alice's to mark
        let listed = [first, second, outgoing];
        assert_eq!(store.mark_read(&alice, &listed).unwrap(), 2);
        assert_eq!(store.mark_read(&alice, &listed).unwrap(), 0);

        let read: Vec<(MessageId, bool)> =
            store.messages(&alice, &bob).unwrap().iter().map(|m| (m.id, m.read)).collect();
        assert_eq!(read, [(first, true), (second, true), (outgoing, false), (later, false)]);
        assert!(store.messages(&alice, &carol).unwrap().iter().all(|m| !m.read));
        assert_eq!(store.mark_read(&alice, &[from_carol, MessageId(999)]).unwrap(), 1);
    }

    #[test]
    fn conversations_most_recent_first_with_unread_counts() {
        let clock = ManualClock::new(100);
        let store = MemoryMessageStore::with_clock(clock.clone());
        let (alice, bob, carol) = users();

        let b1 = store.put_message(&bob, &alice, &envelope("b1")).unwrap();
        let b2 = store.put_message(&bob, &alice, &envelope("b2")).unwrap();
        clock.advance(50);
        store.put_message(&carol, &alice, &envelope("c1")).unwrap();
        clock.advance(50);
        store.put_message(&alice, &bob, &envelope("a1")).unwrap();

        let summaries = store.conversations(&alice).unwrap();
        assert_eq!(
            summaries,
            vec![
                ConversationSummary { other: bob.clone(), last_message_at_secs: 200, unread_count: 2 },
                ConversationSummary { other: carol.clone(), last_message_at_secs: 150, unread_count: 1 },
            ]
        );

        store.mark_read(&alice, &[b1, b2]).unwrap();
        assert_eq!(store.conversations(&alice).unwrap()[0].unread_count, 0);

        // Bob's view: alice's one message is unread for him
        let bob_view = store.conversations(&bob).unwrap();
        assert_eq!(bob_view.len(), 1);
        assert_eq!(bob_view[0].unread_count, 1);
    }

    #[test]
    fn clones_share_storage() {
        let store = MemoryMessageStore::new();
        let clone = store.clone();
        let (alice, bob, _) = users();

        store.put_message(&alice, &bob, &envelope("x")).unwrap();
        assert_eq!(clone.message_count(), 1);
    }
}
