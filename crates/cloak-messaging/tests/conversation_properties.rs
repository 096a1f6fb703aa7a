//! Property-based tests for conversation listings
//!
//! For any interleaving of messages between two users:
//!
//! 1. **Order**: listings follow send order for both participants
//! 2. **Content**: every incoming message decrypts to what was sent
//! 3. **Unread counts**: match a simple model until the reader lists them

use std::sync::OnceLock;

use cloak_crypto::{CipherConfig, HybridCipher, KeyPair, RustCryptoBackend};
use cloak_messaging::{
    KeyCustody, KeyVault, ManualClock, MemoryKeyDirectory, MemoryKeyVault, MemoryMessageStore,
    MessageBody, Messenger, UserId,
};
use proptest::prelude::*;

static ALICE: OnceLock<KeyPair> = OnceLock::new();
static BOB: OnceLock<KeyPair> = OnceLock::new();

fn cipher() -> HybridCipher<RustCryptoBackend> {
    HybridCipher::new(RustCryptoBackend::new(), CipherConfig::default()).unwrap()
}

fn key_pair(slot: &'static OnceLock<KeyPair>) -> &'static KeyPair {
    slot.get_or_init(|| cipher().generate_key_pair().unwrap())
}

// Enroll with a pre-generated pair so each case skips RSA generation
fn custody(
    messenger: &Messenger<RustCryptoBackend, MemoryKeyDirectory, MemoryMessageStore<ManualClock>>,
    name: &str,
    pair: &KeyPair,
) -> KeyCustody<MemoryKeyVault> {
    let user = UserId::new(name);
    let vault = MemoryKeyVault::new();
    vault.store_private_key(&user, pair.private_key()).unwrap();
    messenger.publish_public_key(&user, pair.public_key()).unwrap();
    KeyCustody::new(user, vault)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_conversation_matches_send_order(
        script in prop::collection::vec((any::<bool>(), "[a-zA-Z0-9 ]{0,40}", 0u64..3), 1..12),
    ) {
        let clock = ManualClock::new(1_000);
        let messenger = Messenger::new(
            cipher(),
            MemoryKeyDirectory::new(),
            MemoryMessageStore::with_clock(clock.clone()),
        );
        let alice = custody(&messenger, "alice", key_pair(&ALICE));
        let bob = custody(&messenger, "bob", key_pair(&BOB));

        for (from_alice, text, delay) in &script {
            clock.advance(*delay);
            let (sender, recipient) =
                if *from_alice { (alice.user(), bob.user()) } else { (bob.user(), alice.user()) };
            messenger.send(sender, recipient, text).unwrap();
        }

        let to_bob = script.iter().filter(|(from_alice, _, _)| *from_alice).count();
        let to_alice = script.len() - to_bob;
        let summaries = messenger.conversations(bob.user()).unwrap();
        prop_assert_eq!(summaries.len(), 1);
        prop_assert_eq!(summaries[0].unread_count, to_bob);
        prop_assert_eq!(messenger.conversations(alice.user()).unwrap()[0].unread_count, to_alice);

        let bob_view = messenger.conversation(&bob, alice.user()).unwrap();
        let alice_view = messenger.conversation(&alice, bob.user()).unwrap();
        prop_assert_eq!(bob_view.len(), script.len());
        prop_assert_eq!(alice_view.len(), script.len());

        for ((from_alice, text, _), (bob_entry, alice_entry)) in
            script.iter().zip(bob_view.iter().zip(alice_view.iter()))
        {
            let sent = MessageBody::Plaintext(text.clone());
            if *from_alice {
                prop_assert_eq!(&bob_entry.body, &sent);
                prop_assert_eq!(&alice_entry.body, &MessageBody::Outgoing);
            } else {
                prop_assert_eq!(&bob_entry.body, &MessageBody::Outgoing);
                prop_assert_eq!(&alice_entry.body, &sent);
            }
        }

        prop_assert_eq!(messenger.conversations(bob.user()).unwrap()[0].unread_count, 0);
        prop_assert_eq!(messenger.conversations(alice.user()).unwrap()[0].unread_count, 0);
    }
}
